//! DAO state machine
//!
//! Components:
//! - `membership`: actors, stake and tiers
//! - `token`: balances, minting, transfers
//! - `rewards`: task escrow and reward disbursement
//! - `tasks`: task and submission lifecycle
//! - `review`: reviews and consensus
//! - `datasets`: dataset registry and access
//! - `governance`: proposals, votes, execution
//! - `faucet`: rate-limited test token faucet
//!
//! Every component holds the same [`DaoContext`]. State-changing calls run
//! through [`DaoContext::execute`], which serializes writers and commits each
//! call as one atomic unit: either every record, index entry and balance it
//! touched is written, or none is.

pub mod datasets;
pub mod faucet;
pub mod governance;
pub mod membership;
pub mod review;
pub mod rewards;
pub mod tasks;
pub mod token;

pub use datasets::{CreateDatasetParams, DatasetRegistry};
pub use faucet::{Faucet, FaucetAccountStatus, FaucetClaim, FaucetStatus};
pub use governance::{GovernanceModule, ProposalParams};
pub use membership::MembershipManager;
pub use review::{ReviewEngine, ReviewOutcome};
pub use rewards::RewardDistributor;
pub use tasks::{CreateTaskParams, SubmissionUpdate, TaskManager, TaskUpdate};
pub use token::DataToken;

use crate::config::DaoConfig;
use crate::core::{Actor, Bytes32, DaoStats, Dataset, Proposal, Task, Timestamp};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, CommitOutcome, KvStore, Record, Repository, SqliteKv, UnitOfWork};
use crate::util::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Shared state handed to every component at construction.
pub struct DaoContext {
    pub store: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
    pub config: DaoConfig,
    write_lock: Mutex<()>,
}

impl DaoContext {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: DaoConfig) -> Self {
        Self {
            store,
            clock,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Run `op` as one atomic unit of work.
    ///
    /// Any error returned by `op` discards the staged writes. A failed commit
    /// check is reported as [`DaoError::Conflict`]; callers decide whether to
    /// retry.
    pub fn execute<T, F>(&self, op: &str, f: F) -> DaoResult<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>, Timestamp) -> DaoResult<T>,
    {
        let _guard = self.write_lock.lock();
        let now = self.clock.now();
        let mut uow = UnitOfWork::new(self.store.as_ref());
        let value = f(&mut uow, now)?;
        match uow.commit()? {
            CommitOutcome::Committed(_) => Ok(value),
            CommitOutcome::CheckFailed => {
                warn!(op, "Atomic commit failed, state changed concurrently");
                Err(DaoError::Conflict(op.to_string()))
            }
        }
    }

    pub(crate) fn repo<E: crate::storage::Entity>(&self) -> Repository<'_, E> {
        Repository::new(self.store.as_ref())
    }
}

/// Facade wiring all components over one store.
pub struct DataDao {
    ctx: Arc<DaoContext>,
    membership: MembershipManager,
    token: DataToken,
    rewards: RewardDistributor,
    tasks: TaskManager,
    reviews: ReviewEngine,
    datasets: DatasetRegistry,
    governance: GovernanceModule,
    faucet: Faucet,
}

impl DataDao {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: DaoConfig) -> Self {
        let ctx = Arc::new(DaoContext::new(store, clock, config));
        Self {
            membership: MembershipManager::new(ctx.clone()),
            token: DataToken::new(ctx.clone()),
            rewards: RewardDistributor::new(ctx.clone()),
            tasks: TaskManager::new(ctx.clone()),
            reviews: ReviewEngine::new(ctx.clone()),
            datasets: DatasetRegistry::new(ctx.clone()),
            governance: GovernanceModule::new(ctx.clone()),
            faucet: Faucet::new(ctx.clone()),
            ctx,
        }
    }

    /// In-memory store on the system clock.
    pub fn open_in_memory(config: DaoConfig) -> DaoResult<Self> {
        let store = SqliteKv::open_in_memory()?;
        Ok(Self::new(Arc::new(store), Arc::new(SystemClock), config))
    }

    pub fn context(&self) -> &Arc<DaoContext> {
        &self.ctx
    }

    pub fn config(&self) -> &DaoConfig {
        &self.ctx.config
    }

    pub fn membership(&self) -> &MembershipManager {
        &self.membership
    }

    pub fn token(&self) -> &DataToken {
        &self.token
    }

    pub fn rewards(&self) -> &RewardDistributor {
        &self.rewards
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn reviews(&self) -> &ReviewEngine {
        &self.reviews
    }

    pub fn datasets(&self) -> &DatasetRegistry {
        &self.datasets
    }

    pub fn governance(&self) -> &GovernanceModule {
        &self.governance
    }

    pub fn faucet(&self) -> &Faucet {
        &self.faucet
    }

    pub fn stats(&self) -> DaoResult<DaoStats> {
        let member_count = self
            .ctx
            .repo::<Actor>()
            .list()?
            .iter()
            .filter(|a| a.is_member())
            .count() as u64;
        Ok(DaoStats {
            member_count,
            task_count: self.ctx.repo::<Task>().count()? as u64,
            dataset_count: self.ctx.repo::<Dataset>().count()? as u64,
            proposal_count: self.ctx.repo::<Proposal>().count()? as u64,
        })
    }

    /// Full content identifier recorded for a packed key.
    pub fn resolve_content(&self, packed: &Bytes32) -> DaoResult<Option<String>> {
        let key = keys::content_ref(packed);
        match self.ctx.store.get(&key)? {
            Some(entry) => match Record::decode(&key, &entry.value)? {
                Record::ContentRef { cid } => Ok(Some(cid)),
                other => Err(DaoError::InvalidState(format!(
                    "{} holds a {}, expected content_ref",
                    key,
                    other.kind()
                ))),
            },
            None => Ok(None),
        }
    }
}

/// Pack `cid` and remember the full identifier under its packed key.
pub(crate) fn record_content(uow: &mut UnitOfWork<'_>, cid: &str) -> DaoResult<Bytes32> {
    let packed = Bytes32::from_cid(cid);
    if cid.is_empty() {
        return Ok(packed);
    }
    let key = keys::content_ref(&packed);
    if !uow.exists(&key)? {
        uow.put_record(
            &key,
            &Record::ContentRef {
                cid: cid.to_string(),
            },
        )?;
    }
    Ok(packed)
}
