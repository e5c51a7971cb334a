//! Membership and tiers
//!
//! Staking moves tokens from the actor's balance into the actor record.
//! Tiers follow the configured breakpoints and never drop while stake is
//! held; only deactivation (which returns the stake) resets them.

use super::{token, DaoContext};
use crate::core::{Actor, Address, Amount, MemberTier, Timestamp};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, UnitOfWork};
use std::sync::Arc;
use tracing::info;

pub(crate) fn load_actor(uow: &mut UnitOfWork<'_>, address: &Address) -> DaoResult<Option<Actor>> {
    Ok(uow.load::<Actor>(&keys::actor(address))?)
}

/// The actor behind `address`, provided it currently holds stake.
pub(crate) fn require_member(uow: &mut UnitOfWork<'_>, address: &Address) -> DaoResult<Actor> {
    match load_actor(uow, address)? {
        Some(actor) if actor.is_member() => Ok(actor),
        _ => Err(DaoError::NotMember(address.clone())),
    }
}

/// Apply a reputation delta to an existing actor; unknown addresses are skipped.
pub(crate) fn adjust_reputation(
    uow: &mut UnitOfWork<'_>,
    address: &Address,
    delta: i64,
    now: Timestamp,
) -> DaoResult<()> {
    if let Some(mut actor) = load_actor(uow, address)? {
        actor.reputation = actor.reputation.saturating_add(delta);
        actor.last_activity_at = now;
        uow.save(&actor)?;
    }
    Ok(())
}

pub struct MembershipManager {
    ctx: Arc<DaoContext>,
}

impl MembershipManager {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    fn tier_for(&self, stake: Amount) -> MemberTier {
        self.ctx.config.membership.tier_for(stake)
    }

    pub fn join_dao(
        &self,
        caller: &Address,
        stake: Amount,
        display_name: Option<String>,
    ) -> DaoResult<Actor> {
        if stake == 0 {
            return Err(DaoError::InvalidParameters("stake must be positive".to_string()));
        }

        self.ctx.execute("join_dao", |uow, now| {
            let mut actor = match load_actor(uow, caller)? {
                Some(existing) if existing.is_member() => {
                    return Err(DaoError::AlreadyMember(caller.clone()))
                }
                Some(mut existing) => {
                    existing.last_activity_at = now;
                    existing
                }
                None => Actor::new(caller.clone(), now),
            };

            token::debit(uow, caller, stake)?;
            actor.staked_amount = stake;
            actor.tier = self.tier_for(stake);
            if display_name.is_some() {
                actor.display_name = display_name;
            }
            uow.save(&actor)?;

            info!(address = %caller, stake, tier = %actor.tier, "Member joined");
            Ok(actor)
        })
    }

    /// Add stake. A zero amount leaves the actor untouched.
    pub fn stake_more(&self, caller: &Address, amount: Amount) -> DaoResult<Actor> {
        self.ctx.execute("stake_more", |uow, now| {
            let mut actor = require_member(uow, caller)?;
            if amount == 0 {
                return Ok(actor);
            }

            token::debit(uow, caller, amount)?;
            actor.staked_amount = actor
                .staked_amount
                .checked_add(amount)
                .ok_or_else(|| DaoError::InvalidParameters("stake overflow".to_string()))?;
            let previous = actor.tier;
            actor.tier = previous.max(self.tier_for(actor.staked_amount));
            actor.last_activity_at = now;
            uow.save(&actor)?;

            if actor.tier != previous {
                info!(address = %caller, from = %previous, to = %actor.tier, "Member tier upgraded");
            }
            info!(address = %caller, amount, stake = actor.staked_amount, "Stake increased");
            Ok(actor)
        })
    }

    /// Zero the stake (returned to the balance) and reset the tier. Refused
    /// while a proposal the actor voted on is still open.
    pub fn deactivate(&self, caller: &Address, address: &Address) -> DaoResult<Actor> {
        if caller != address && !self.ctx.config.is_admin(caller) {
            return Err(DaoError::Unauthorized(format!(
                "{} cannot deactivate {}",
                caller, address
            )));
        }

        self.ctx.execute("deactivate", |uow, now| {
            let mut actor = require_member(uow, address)?;
            if now < actor.stake_locked_until {
                return Err(DaoError::StakeLocked {
                    address: address.clone(),
                    until: actor.stake_locked_until,
                });
            }
            let refund = actor.staked_amount;
            token::credit(uow, address, refund)?;
            actor.staked_amount = 0;
            actor.tier = MemberTier::None;
            actor.last_activity_at = now;
            uow.save(&actor)?;

            info!(address = %address, refund, by = %caller, "Member deactivated");
            Ok(actor)
        })
    }

    pub fn verify(&self, caller: &Address, address: &Address) -> DaoResult<Actor> {
        if !self.ctx.config.is_admin(caller) {
            return Err(DaoError::Unauthorized(format!(
                "{} is not allowed to verify actors",
                caller
            )));
        }

        self.ctx.execute("verify", |uow, now| {
            let mut actor = load_actor(uow, address)?
                .ok_or_else(|| DaoError::not_found("Actor", address))?;
            actor.is_verified = true;
            actor.last_activity_at = now;
            uow.save(&actor)?;

            info!(address = %address, by = %caller, "Actor verified");
            Ok(actor)
        })
    }

    pub fn find(&self, address: &Address) -> DaoResult<Option<Actor>> {
        Ok(self.ctx.repo::<Actor>().get(&keys::actor(address))?)
    }

    pub fn get(&self, address: &Address) -> DaoResult<Actor> {
        self.find(address)?
            .ok_or_else(|| DaoError::not_found("Actor", address))
    }

    pub fn list(&self) -> DaoResult<Vec<Actor>> {
        Ok(self.ctx.repo::<Actor>().list()?)
    }

    pub fn is_member(&self, address: &Address) -> DaoResult<bool> {
        Ok(self.find(address)?.map(|a| a.is_member()).unwrap_or(false))
    }

    pub fn member_count(&self) -> DaoResult<u64> {
        Ok(self.list()?.iter().filter(|a| a.is_member()).count() as u64)
    }
}
