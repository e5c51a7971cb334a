//! Error types for DataDAO operations

use crate::core::{Address, ProposalId, SubmissionId, TaskId, Timestamp};
use crate::storage::StorageError;
use thiserror::Error;

/// Result type for DAO operations
pub type DaoResult<T> = Result<T, DaoError>;

/// Coarse classification of every failure a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    Validation,
    /// Unknown id or address
    NotFound,
    /// Operation illegal in the current lifecycle state
    StateConflict,
    /// Caller lacks the required role or stake
    Authorization,
    /// Depleted pool or balance, rate limit hit
    ResourceExhausted,
    /// Storage or serialization failure
    Internal,
}

/// Errors that can occur while executing DAO operations
#[derive(Error, Debug)]
pub enum DaoError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid content reference: {0}")]
    InvalidContentRef(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Task {0} is not open")]
    TaskNotOpen(TaskId),

    #[error("Task {task_id} deadline passed at {deadline}")]
    DeadlinePassed { task_id: TaskId, deadline: i64 },

    #[error("Submission {0} is not pending")]
    SubmissionNotPending(SubmissionId),

    #[error("Reviewer {reviewer} already reviewed submission {submission_id}")]
    AlreadyReviewed {
        submission_id: SubmissionId,
        reviewer: Address,
    },

    #[error("Address {0} is already a member")]
    AlreadyMember(Address),

    #[error("Address {0} is not a member")]
    NotMember(Address),

    #[error("Stake of {address} is locked by live votes until {until}")]
    StakeLocked { address: Address, until: Timestamp },

    #[error("Voting on proposal {0} is not open")]
    VotingClosed(ProposalId),

    #[error("Address {voter} already voted on proposal {proposal_id}")]
    AlreadyVoted {
        proposal_id: ProposalId,
        voter: Address,
    },

    #[error("Voting on proposal {proposal_id} ends at {end_time}")]
    VotingNotEnded { proposal_id: ProposalId, end_time: i64 },

    #[error("Proposal {0} already executed")]
    AlreadyExecuted(ProposalId),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient stake: required {required}, actual {actual}")]
    InsufficientStake { required: u64, actual: u64 },

    #[error("Insufficient balance for {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: u64,
        available: u64,
    },

    #[error("Reward pool exhausted for task {task_id}: required {required}, available {available}")]
    PoolExhausted {
        task_id: TaskId,
        required: u64,
        available: u64,
    },

    #[error("Rate limited: {message}")]
    RateLimited { message: String, retry_after_secs: u64 },

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Concurrent write conflict, retry the operation: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl DaoError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        DaoError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DaoError::InvalidParameters(_)
            | DaoError::InvalidAddress(_)
            | DaoError::InvalidContentRef(_) => ErrorKind::Validation,
            DaoError::NotFound { .. } => ErrorKind::NotFound,
            DaoError::TaskNotOpen(_)
            | DaoError::DeadlinePassed { .. }
            | DaoError::SubmissionNotPending(_)
            | DaoError::AlreadyReviewed { .. }
            | DaoError::AlreadyMember(_)
            | DaoError::VotingClosed(_)
            | DaoError::AlreadyVoted { .. }
            | DaoError::StakeLocked { .. }
            | DaoError::VotingNotEnded { .. }
            | DaoError::AlreadyExecuted(_)
            | DaoError::InvalidState(_)
            | DaoError::Conflict(_) => ErrorKind::StateConflict,
            DaoError::NotMember(_)
            | DaoError::Unauthorized(_)
            | DaoError::InsufficientStake { .. } => ErrorKind::Authorization,
            DaoError::InsufficientBalance { .. }
            | DaoError::PoolExhausted { .. }
            | DaoError::RateLimited { .. }
            | DaoError::Unavailable(_) => ErrorKind::ResourceExhausted,
            DaoError::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for DaoError {
    fn from(err: serde_json::Error) -> Self {
        DaoError::Storage(StorageError::Serialization(err.to_string()))
    }
}
