//! Governance
//!
//! Stake-weighted proposals. Voting weight is the voter's stake when the vote
//! is cast and is never re-evaluated. The outcome is computed when the
//! proposal is executed, after its window closes.

use super::{datasets, membership, tasks, token, DaoContext};
use crate::core::{
    Address, Proposal, ProposalCall, ProposalId, ProposalStatus, ProposalType, Timestamp, Vote,
    VoteSupport,
};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, UnitOfWork};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalParams {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub proposal_type: ProposalType,
    #[serde(default)]
    pub calls: Vec<ProposalCall>,
}

fn load_proposal(uow: &mut UnitOfWork<'_>, id: ProposalId) -> DaoResult<Proposal> {
    uow.load::<Proposal>(&keys::proposal(id))?
        .ok_or_else(|| DaoError::not_found("Proposal", id))
}

pub struct GovernanceModule {
    ctx: Arc<DaoContext>,
}

impl GovernanceModule {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    pub fn propose(&self, caller: &Address, params: ProposalParams) -> DaoResult<Proposal> {
        if params.title.trim().is_empty() {
            return Err(DaoError::InvalidParameters("title is required".to_string()));
        }
        let config = &self.ctx.config.governance;

        self.ctx.execute("propose", |uow, now| {
            let stake = membership::load_actor(uow, caller)?
                .map(|a| a.staked_amount)
                .unwrap_or(0);
            if stake < config.min_proposal_stake {
                return Err(DaoError::InsufficientStake {
                    required: config.min_proposal_stake,
                    actual: stake,
                });
            }

            let id = uow.next_id("proposals")?;
            let start_time = now + config.voting_delay_secs;
            let proposal = Proposal {
                id,
                proposer: caller.clone(),
                title: params.title.trim().to_string(),
                description: params.description,
                proposal_type: params.proposal_type,
                calls: params.calls,
                start_time,
                end_time: start_time + config.voting_period_secs,
                yes_votes: 0,
                no_votes: 0,
                abstain_votes: 0,
                votes: BTreeMap::new(),
                executed: false,
                passed: false,
                executed_at: None,
                created_at: now,
            };
            uow.insert(&proposal)?;

            info!(
                proposal_id = id,
                proposer = %caller,
                proposal_type = ?proposal.proposal_type,
                start_time,
                end_time = proposal.end_time,
                "Proposal created"
            );
            Ok(proposal)
        })
    }

    pub fn cast_vote(&self, caller: &Address, id: ProposalId, support: VoteSupport) -> DaoResult<Proposal> {
        self.ctx.execute("cast_vote", |uow, now| {
            let mut proposal = load_proposal(uow, id)?;
            if !proposal.is_voting_open(now) {
                return Err(DaoError::VotingClosed(id));
            }
            if proposal.votes.contains_key(caller) {
                return Err(DaoError::AlreadyVoted {
                    proposal_id: id,
                    voter: caller.clone(),
                });
            }
            let mut voter = membership::require_member(uow, caller)?;
            let weight = voter.staked_amount;
            voter.stake_locked_until = voter.stake_locked_until.max(proposal.end_time);
            uow.save(&voter)?;

            let tally = match support {
                VoteSupport::For => &mut proposal.yes_votes,
                VoteSupport::Against => &mut proposal.no_votes,
                VoteSupport::Abstain => &mut proposal.abstain_votes,
            };
            *tally = tally.saturating_add(weight);
            proposal.votes.insert(
                caller.clone(),
                Vote {
                    support,
                    weight,
                    cast_at: now,
                },
            );
            uow.save(&proposal)?;

            info!(proposal_id = id, voter = %caller, support = ?support, weight, "Vote cast");
            Ok(proposal)
        })
    }

    /// Settle a proposal once its window has closed. Calls of a passed
    /// proposal are applied in the same commit; one failing call fails the
    /// whole execution and the proposal stays unexecuted.
    pub fn execute_proposal(&self, caller: &Address, id: ProposalId) -> DaoResult<Proposal> {
        let ctx = self.ctx.as_ref();
        ctx.execute("execute_proposal", |uow, now| {
            let mut proposal = load_proposal(uow, id)?;
            if proposal.executed {
                return Err(DaoError::AlreadyExecuted(id));
            }
            if now < proposal.end_time {
                return Err(DaoError::VotingNotEnded {
                    proposal_id: id,
                    end_time: proposal.end_time,
                });
            }

            proposal.passed = proposal.tally_passes(ctx.config.governance.quorum);
            if proposal.passed {
                for call in &proposal.calls {
                    apply_call(ctx, uow, id, call, now)?;
                }
            }
            proposal.executed = true;
            proposal.executed_at = Some(now);
            uow.save(&proposal)?;

            info!(
                proposal_id = id,
                by = %caller,
                passed = proposal.passed,
                yes = proposal.yes_votes,
                no = proposal.no_votes,
                abstain = proposal.abstain_votes,
                "Proposal executed"
            );
            Ok(proposal)
        })
    }

    // ==================== Queries ====================

    pub fn get(&self, id: ProposalId) -> DaoResult<Proposal> {
        self.ctx
            .repo::<Proposal>()
            .get(&keys::proposal(id))?
            .ok_or_else(|| DaoError::not_found("Proposal", id))
    }

    pub fn list(&self) -> DaoResult<Vec<Proposal>> {
        Ok(self.ctx.repo::<Proposal>().list()?)
    }

    pub fn by_proposer(&self, proposer: &Address) -> DaoResult<Vec<Proposal>> {
        let prefix = keys::index_prefix(keys::PROPOSALS_BY_PROPOSER, proposer.as_str());
        Ok(self.ctx.repo::<Proposal>().list_indexed(&prefix)?)
    }

    pub fn status(&self, id: ProposalId) -> DaoResult<ProposalStatus> {
        let proposal = self.get(id)?;
        Ok(proposal.status_at(self.ctx.now(), self.ctx.config.governance.quorum))
    }
}

fn apply_call(
    ctx: &DaoContext,
    uow: &mut UnitOfWork<'_>,
    proposal_id: ProposalId,
    call: &ProposalCall,
    now: Timestamp,
) -> DaoResult<()> {
    match call {
        ProposalCall::CloseTask { task_id } => {
            tasks::close_by_governance(uow, *task_id, now)?;
        }
        ProposalCall::ValidateDataset { dataset_id } => {
            let governance = Address::system("governance");
            datasets::mark_validated(uow, *dataset_id, &governance, now)?;
        }
        ProposalCall::TreasuryTransfer { to, amount } => {
            token::transfer(uow, &ctx.config.treasury_address, to, *amount)?;
            info!(proposal_id, to = %to, amount, "Treasury transfer");
        }
        ProposalCall::Raw {
            target,
            value,
            calldata,
        } => {
            warn!(
                proposal_id,
                target = %target,
                value,
                calldata_len = calldata.len(),
                "Raw call recorded, not interpreted"
            );
        }
    }
    Ok(())
}
