//! Reward escrow and disbursement
//!
//! Payout order for every reward: mint when minting is enabled and the cap
//! allows it, otherwise move tokens out of the task's pool. If neither
//! source covers the amount the caller's whole operation fails.

use super::{token, DaoContext};
use crate::core::{Address, Amount, RewardPool, TaskId};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, UnitOfWork};
use std::sync::Arc;
use tracing::info;

/// Escrow for a task: every submission reward plus every review it can take.
pub fn reward_budget(
    reward_per_submission: Amount,
    reward_per_review: Amount,
    required_submissions: u32,
    required_validations: u32,
) -> Option<Amount> {
    let submissions = reward_per_submission.checked_mul(required_submissions as Amount)?;
    let reviews = reward_per_review
        .checked_mul(required_submissions as Amount)?
        .checked_mul(required_validations as Amount)?;
    submissions.checked_add(reviews)
}

pub(crate) fn load_pool(uow: &mut UnitOfWork<'_>, task_id: TaskId) -> DaoResult<Option<RewardPool>> {
    Ok(uow.load::<RewardPool>(&keys::reward_pool(task_id))?)
}

/// Move `amount` from `funder` into the pool for `task_id`, opening it if needed.
pub(crate) fn fund_pool(
    uow: &mut UnitOfWork<'_>,
    task_id: TaskId,
    funder: &Address,
    amount: Amount,
) -> DaoResult<RewardPool> {
    token::debit(uow, funder, amount)?;
    let mut pool = load_pool(uow, task_id)?.unwrap_or(RewardPool {
        task_id,
        funded: 0,
        balance: 0,
        disbursed: 0,
        refunded: 0,
    });
    let overflow = || DaoError::InvalidParameters("reward pool overflow".to_string());
    pool.funded = pool.funded.checked_add(amount).ok_or_else(overflow)?;
    pool.balance = pool.balance.checked_add(amount).ok_or_else(overflow)?;
    uow.save(&pool)?;
    info!(task_id, funder = %funder, amount, balance = pool.balance, "Reward pool funded");
    Ok(pool)
}

/// Return whatever is left in the pool to `to`.
pub(crate) fn refund_pool(uow: &mut UnitOfWork<'_>, task_id: TaskId, to: &Address) -> DaoResult<Amount> {
    let Some(mut pool) = load_pool(uow, task_id)? else {
        return Ok(0);
    };
    let amount = pool.balance;
    if amount == 0 {
        return Ok(0);
    }
    pool.balance = 0;
    pool.refunded += amount;
    uow.save(&pool)?;
    token::credit(uow, to, amount)?;
    info!(task_id, to = %to, amount, "Reward pool refunded");
    Ok(amount)
}

pub(crate) fn disburse(
    ctx: &DaoContext,
    uow: &mut UnitOfWork<'_>,
    task_id: TaskId,
    to: &Address,
    amount: Amount,
    reason: &'static str,
) -> DaoResult<Amount> {
    if amount == 0 {
        return Ok(0);
    }

    let rewards = &ctx.config.rewards;
    if rewards.mint_enabled {
        let minted = token::supply(uow)?.reward_minted;
        let within_cap = rewards
            .mint_cap
            .map_or(true, |cap| minted.saturating_add(amount) <= cap);
        if within_cap {
            token::mint(uow, to, amount, token::MintSource::Reward)?;
            info!(task_id, to = %to, amount, reason, source = "mint", "Reward disbursed");
            return Ok(amount);
        }
    }

    let mut pool = load_pool(uow, task_id)?.ok_or(DaoError::PoolExhausted {
        task_id,
        required: amount,
        available: 0,
    })?;
    if pool.balance < amount {
        return Err(DaoError::PoolExhausted {
            task_id,
            required: amount,
            available: pool.balance,
        });
    }
    pool.balance -= amount;
    pool.disbursed += amount;
    uow.save(&pool)?;
    token::credit(uow, to, amount)?;
    info!(task_id, to = %to, amount, reason, source = "pool", "Reward disbursed");
    Ok(amount)
}

/// Read access to task reward pools.
pub struct RewardDistributor {
    ctx: Arc<DaoContext>,
}

impl RewardDistributor {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    pub fn pool(&self, task_id: TaskId) -> DaoResult<Option<RewardPool>> {
        Ok(self.ctx.repo::<RewardPool>().get(&keys::reward_pool(task_id))?)
    }

    pub fn budget_for(&self, task: &crate::core::Task) -> Option<Amount> {
        reward_budget(
            task.reward_per_submission,
            task.reward_per_review,
            task.required_submissions,
            task.required_validations,
        )
    }
}
