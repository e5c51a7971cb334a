//! Test token faucet
//!
//! Each address gets `max_requests_per_day` claims per rolling window. The
//! window opens with the first claim after the previous one expired.

use super::{token, DaoContext};
use crate::core::{Address, Amount, FaucetUsage, Timestamp};
use crate::error::{DaoError, DaoResult};
use crate::storage::keys;
use crate::util::clock::format_duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetClaim {
    pub address: Address,
    pub amount: Amount,
    pub balance: Amount,
    pub requests_remaining: u32,
    pub next_available_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetAccountStatus {
    pub address: Address,
    pub requests_remaining: u32,
    pub total_claimed: Amount,
    pub next_available_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetStatus {
    pub enabled: bool,
    pub amount_per_request: Amount,
    pub max_requests_per_day: u32,
    pub window_secs: i64,
    pub total_distributed: Amount,
    pub account: Option<FaucetAccountStatus>,
}

pub struct Faucet {
    ctx: Arc<DaoContext>,
}

impl Faucet {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    fn window_expired(&self, usage: &FaucetUsage, now: Timestamp) -> bool {
        now >= usage.window_start + self.ctx.config.faucet.window_secs
    }

    /// Claims left for `usage` at `now`, and when the window resets if none are.
    fn remaining(&self, usage: Option<&FaucetUsage>, now: Timestamp) -> (u32, Option<Timestamp>) {
        let max = self.ctx.config.faucet.max_requests_per_day;
        match usage {
            Some(u) if !self.window_expired(u, now) => {
                let left = max.saturating_sub(u.requests_in_window);
                let reset = (left == 0).then(|| u.window_start + self.ctx.config.faucet.window_secs);
                (left, reset)
            }
            _ => (max, None),
        }
    }

    pub fn request(&self, address: &Address) -> DaoResult<FaucetClaim> {
        let config = &self.ctx.config.faucet;
        if !config.enabled || config.max_requests_per_day == 0 {
            return Err(DaoError::Unavailable("faucet is disabled".to_string()));
        }

        self.ctx.execute("faucet_request", |uow, now| {
            let previous = uow.load::<FaucetUsage>(&keys::faucet(address))?;
            let (left, reset_at) = self.remaining(previous.as_ref(), now);
            if left == 0 {
                let wait = reset_at.map(|at| at - now).unwrap_or(config.window_secs);
                return Err(DaoError::RateLimited {
                    message: format!(
                        "Limit of {} request(s) per window reached, try again in {}",
                        config.max_requests_per_day,
                        format_duration(wait)
                    ),
                    retry_after_secs: wait.max(0) as u64,
                });
            }

            let mut usage = match previous {
                Some(u) if !self.window_expired(&u, now) => u,
                Some(u) => FaucetUsage {
                    window_start: now,
                    requests_in_window: 0,
                    ..u
                },
                None => FaucetUsage {
                    address: address.clone(),
                    window_start: now,
                    requests_in_window: 0,
                    total_claimed: 0,
                    last_request_at: now,
                },
            };
            usage.requests_in_window += 1;
            usage.total_claimed = usage.total_claimed.saturating_add(config.amount_per_request);
            usage.last_request_at = now;
            uow.save(&usage)?;

            let balance = token::mint(uow, address, config.amount_per_request, token::MintSource::Faucet)?;
            let (requests_remaining, next_available_at) = self.remaining(Some(&usage), now);

            info!(
                address = %address,
                amount = config.amount_per_request,
                requests_remaining,
                "Faucet tokens distributed"
            );
            Ok(FaucetClaim {
                address: address.clone(),
                amount: config.amount_per_request,
                balance,
                requests_remaining,
                next_available_at,
            })
        })
    }

    pub fn status(&self, address: Option<&Address>) -> DaoResult<FaucetStatus> {
        let config = &self.ctx.config.faucet;
        let now = self.ctx.now();
        let total_distributed = self
            .ctx
            .repo::<crate::core::TokenSupply>()
            .get(keys::TOKEN_SUPPLY)?
            .unwrap_or_default()
            .faucet_minted;

        let account = match address {
            Some(address) => {
                let usage = self
                    .ctx
                    .repo::<FaucetUsage>()
                    .get(&keys::faucet(address))?;
                let (requests_remaining, next_available_at) = self.remaining(usage.as_ref(), now);
                Some(FaucetAccountStatus {
                    address: address.clone(),
                    requests_remaining,
                    total_claimed: usage.map(|u| u.total_claimed).unwrap_or(0),
                    next_available_at,
                })
            }
            None => None,
        };

        Ok(FaucetStatus {
            enabled: config.enabled,
            amount_per_request: config.amount_per_request,
            max_requests_per_day: config.max_requests_per_day,
            window_secs: config.window_secs,
            total_distributed,
            account,
        })
    }
}
