//! Token ledger
//!
//! Balances are stored per address. Minting updates the supply record so the
//! faucet and reward minting stay auditable.

use super::DaoContext;
use crate::core::{Address, Amount, Balance, TokenSupply};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, UnitOfWork};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintSource {
    Faucet,
    Reward,
}

pub(crate) fn balance_of(uow: &mut UnitOfWork<'_>, address: &Address) -> DaoResult<Amount> {
    Ok(uow
        .load::<Balance>(&keys::balance(address))?
        .map(|b| b.amount)
        .unwrap_or(0))
}

pub(crate) fn credit(uow: &mut UnitOfWork<'_>, address: &Address, amount: Amount) -> DaoResult<Amount> {
    let current = balance_of(uow, address)?;
    let updated = current
        .checked_add(amount)
        .ok_or_else(|| DaoError::InvalidParameters(format!("balance overflow for {}", address)))?;
    uow.save(&Balance {
        address: address.clone(),
        amount: updated,
    })?;
    debug!(address = %address, amount, balance = updated, "Credited");
    Ok(updated)
}

pub(crate) fn debit(uow: &mut UnitOfWork<'_>, address: &Address, amount: Amount) -> DaoResult<Amount> {
    let current = balance_of(uow, address)?;
    let updated = current
        .checked_sub(amount)
        .ok_or_else(|| DaoError::InsufficientBalance {
            address: address.clone(),
            required: amount,
            available: current,
        })?;
    uow.save(&Balance {
        address: address.clone(),
        amount: updated,
    })?;
    debug!(address = %address, amount, balance = updated, "Debited");
    Ok(updated)
}

pub(crate) fn transfer(
    uow: &mut UnitOfWork<'_>,
    from: &Address,
    to: &Address,
    amount: Amount,
) -> DaoResult<()> {
    if from == to {
        return Ok(());
    }
    debit(uow, from, amount)?;
    credit(uow, to, amount)?;
    Ok(())
}

pub(crate) fn supply(uow: &mut UnitOfWork<'_>) -> DaoResult<TokenSupply> {
    Ok(uow
        .load::<TokenSupply>(keys::TOKEN_SUPPLY)?
        .unwrap_or_default())
}

pub(crate) fn mint(
    uow: &mut UnitOfWork<'_>,
    to: &Address,
    amount: Amount,
    source: MintSource,
) -> DaoResult<Amount> {
    let mut supply = supply(uow)?;
    let overflow = || DaoError::InvalidParameters("token supply overflow".to_string());
    supply.total_minted = supply.total_minted.checked_add(amount).ok_or_else(overflow)?;
    match source {
        MintSource::Faucet => {
            supply.faucet_minted = supply.faucet_minted.checked_add(amount).ok_or_else(overflow)?
        }
        MintSource::Reward => {
            supply.reward_minted = supply.reward_minted.checked_add(amount).ok_or_else(overflow)?
        }
    }
    uow.save(&supply)?;
    let balance = credit(uow, to, amount)?;
    info!(to = %to, amount, source = ?source, "Minted tokens");
    Ok(balance)
}

/// Read and transfer access to the ledger.
pub struct DataToken {
    ctx: Arc<DaoContext>,
}

impl DataToken {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    pub fn balance_of(&self, address: &Address) -> DaoResult<Amount> {
        Ok(self
            .ctx
            .repo::<Balance>()
            .get(&keys::balance(address))?
            .map(|b| b.amount)
            .unwrap_or(0))
    }

    pub fn supply(&self) -> DaoResult<TokenSupply> {
        Ok(self
            .ctx
            .repo::<TokenSupply>()
            .get(keys::TOKEN_SUPPLY)?
            .unwrap_or_default())
    }

    pub fn transfer(&self, from: &Address, to: &Address, amount: Amount) -> DaoResult<Amount> {
        if amount == 0 {
            return Err(DaoError::InvalidParameters("amount must be positive".to_string()));
        }
        self.ctx.execute("transfer", |uow, _now| {
            transfer(uow, from, to, amount)?;
            info!(from = %from, to = %to, amount, "Transferred tokens");
            balance_of(uow, from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::testing::{addr, fund, harness};

    #[test]
    fn test_transfer_moves_balance() {
        let (dao, _clock) = harness();
        let alice = addr("alice");
        let bob = addr("bob");
        fund(&dao, &alice, 500);

        let remaining = dao.token().transfer(&alice, &bob, 200).unwrap();
        assert_eq!(remaining, 300);
        assert_eq!(dao.token().balance_of(&bob).unwrap(), 200);
    }

    #[test]
    fn test_transfer_insufficient_balance_changes_nothing() {
        let (dao, _clock) = harness();
        let alice = addr("alice");
        let bob = addr("bob");
        fund(&dao, &alice, 50);

        let err = dao.token().transfer(&alice, &bob, 51).unwrap_err();
        assert!(matches!(err, DaoError::InsufficientBalance { available: 50, .. }));
        assert_eq!(dao.token().balance_of(&alice).unwrap(), 50);
        assert_eq!(dao.token().balance_of(&bob).unwrap(), 0);
    }

    #[test]
    fn test_mint_tracks_supply() {
        let (dao, _clock) = harness();
        fund(&dao, &addr("alice"), 70);
        let supply = dao.token().supply().unwrap();
        assert_eq!(supply.total_minted, 70);
        assert_eq!(supply.faucet_minted, 70);
        assert_eq!(supply.reward_minted, 0);
    }

    #[test]
    fn test_zero_transfer_rejected() {
        let (dao, _clock) = harness();
        assert!(dao
            .token()
            .transfer(&addr("alice"), &addr("bob"), 0)
            .is_err());
    }
}
