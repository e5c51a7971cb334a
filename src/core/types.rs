//! Domain records shared by the DAO components, the storage layer and the API.

use super::{Address, Bytes32};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type TaskId = u64;
pub type SubmissionId = u64;
pub type ReviewId = u64;
pub type DatasetId = u64;
pub type ProposalId = u64;

/// Token base units.
pub type Amount = u64;

/// Unix seconds.
pub type Timestamp = i64;

// ============================================================================
// MEMBERSHIP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemberTier {
    #[default]
    None,
    Basic,
    Advanced,
    Expert,
}

impl MemberTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberTier::None => "none",
            MemberTier::Basic => "basic",
            MemberTier::Advanced => "advanced",
            MemberTier::Expert => "expert",
        }
    }
}

impl std::fmt::Display for MemberTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant. Created on first stake, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub address: Address,
    pub staked_amount: Amount,
    pub tier: MemberTier,
    pub reputation: i64,
    pub is_verified: bool,
    pub display_name: Option<String>,
    pub joined_at: Timestamp,
    pub last_activity_at: Timestamp,
    /// End of the latest voting window this actor's stake was counted in.
    #[serde(default)]
    pub stake_locked_until: Timestamp,
}

impl Actor {
    pub fn new(address: Address, now: Timestamp) -> Self {
        Self {
            address,
            staked_amount: 0,
            tier: MemberTier::None,
            reputation: 0,
            is_verified: false,
            display_name: None,
            joined_at: now,
            last_activity_at: now,
            stake_locked_until: 0,
        }
    }

    pub fn is_member(&self) -> bool {
        self.staked_amount > 0
    }
}

// ============================================================================
// TASKS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DataCollection,
    DataLabeling,
    DataValidation,
    DataCuration,
    ModelTraining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Restricted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Completed,
    Closed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Completed => "completed",
            TaskStatus::Closed => "closed",
        }
    }

    /// Check if a status transition is valid. Completed and Closed are terminal.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Open, TaskStatus::Completed) | (TaskStatus::Open, TaskStatus::Closed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub creator: Address,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub reward_per_submission: Amount,
    pub reward_per_review: Amount,
    pub required_submissions: u32,
    pub required_validations: u32,
    pub deadline: Timestamp,
    pub visibility: Visibility,
    pub access_conditions: Option<String>,
    pub content_reference: Option<String>,
    pub content_key: Bytes32,
    pub status: TaskStatus,
    #[serde(default)]
    pub nominated_reviewers: BTreeSet<Address>,
    pub submission_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
    /// Tokens locked in the task's reward pool at creation.
    pub escrowed: Amount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status == TaskStatus::Open
    }

    pub fn deadline_passed(&self, now: Timestamp) -> bool {
        now > self.deadline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub task_id: TaskId,
    pub submitter: Address,
    pub content_reference: String,
    pub content_key: Bytes32,
    pub is_encrypted: bool,
    pub status: SubmissionStatus,
    pub approvals: u32,
    pub rejections: u32,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: Timestamp,
    pub decided_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub submission_id: SubmissionId,
    pub task_id: TaskId,
    pub reviewer: Address,
    pub approved: bool,
    pub feedback: Option<String>,
    pub reward_paid: Amount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ============================================================================
// DATASETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    #[default]
    Public,
    TokenGated,
    NftGated,
    Subscription,
    PayPerUse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardShare {
    pub address: Address,
    pub share_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub owner: Address,
    pub name: String,
    pub description: String,
    pub category: String,
    pub content_reference: String,
    pub content_key: Bytes32,
    pub metadata_reference: Option<String>,
    pub is_encrypted: bool,
    pub access_conditions: Option<String>,
    pub visibility: Visibility,
    pub access_type: AccessType,
    pub price: Amount,
    #[serde(default)]
    pub authorized_users: BTreeSet<Address>,
    /// Subscriber expiry times
    #[serde(default)]
    pub subscriptions: BTreeMap<Address, Timestamp>,
    #[serde(default)]
    pub reward_recipients: Vec<RewardShare>,
    pub validated: bool,
    pub validated_by: Option<Address>,
    #[serde(default)]
    pub linked_task_ids: Vec<TaskId>,
    pub usage_count: u64,
    pub revenue: Amount,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Dataset {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public && self.access_type == AccessType::Public
    }
}

// ============================================================================
// GOVERNANCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    #[default]
    General,
    TaskCreation,
    DatasetValidation,
    MembershipRule,
    Treasury,
    ContractUpgrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSupport {
    For,
    Against,
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub support: VoteSupport,
    pub weight: Amount,
    pub cast_at: Timestamp,
}

/// Execution payload applied when a proposal passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposalCall {
    CloseTask { task_id: TaskId },
    ValidateDataset { dataset_id: DatasetId },
    TreasuryTransfer { to: Address, amount: Amount },
    /// Opaque call kept for the record; not interpreted.
    Raw {
        target: String,
        value: Amount,
        calldata: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Active,
    Passed,
    Failed,
    Executed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub title: String,
    pub description: String,
    pub proposal_type: ProposalType,
    #[serde(default)]
    pub calls: Vec<ProposalCall>,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub yes_votes: Amount,
    pub no_votes: Amount,
    pub abstain_votes: Amount,
    #[serde(default)]
    pub votes: BTreeMap<Address, Vote>,
    pub executed: bool,
    pub passed: bool,
    pub executed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Proposal {
    pub fn is_voting_open(&self, now: Timestamp) -> bool {
        !self.executed && now >= self.start_time && now < self.end_time
    }

    pub fn total_weight(&self) -> Amount {
        self.yes_votes
            .saturating_add(self.no_votes)
            .saturating_add(self.abstain_votes)
    }

    /// Lifecycle status at `now`, with an optional minimum participating weight.
    pub fn status_at(&self, now: Timestamp, quorum: Option<Amount>) -> ProposalStatus {
        if self.executed {
            ProposalStatus::Executed
        } else if now < self.start_time {
            ProposalStatus::Pending
        } else if now < self.end_time {
            ProposalStatus::Active
        } else if self.tally_passes(quorum) {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        }
    }

    pub fn tally_passes(&self, quorum: Option<Amount>) -> bool {
        let quorum_met = quorum.map_or(true, |q| self.total_weight() >= q);
        quorum_met && self.yes_votes > self.no_votes
    }
}

// ============================================================================
// TOKEN LEDGER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub address: Address,
    pub amount: Amount,
}

/// Escrow held for a task's rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    pub task_id: TaskId,
    pub funded: Amount,
    pub balance: Amount,
    pub disbursed: Amount,
    pub refunded: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSupply {
    pub total_minted: Amount,
    pub faucet_minted: Amount,
    pub reward_minted: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetUsage {
    pub address: Address,
    pub window_start: Timestamp,
    pub requests_in_window: u32,
    pub total_claimed: Amount,
    pub last_request_at: Timestamp,
}

/// Aggregate counters reported by `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoStats {
    pub member_count: u64,
    pub task_count: u64,
    pub dataset_count: u64,
    pub proposal_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(yes: Amount, no: Amount, abstain: Amount) -> Proposal {
        Proposal {
            id: 1,
            proposer: Address::system("proposer"),
            title: "t".into(),
            description: String::new(),
            proposal_type: ProposalType::General,
            calls: vec![],
            start_time: 100,
            end_time: 200,
            yes_votes: yes,
            no_votes: no,
            abstain_votes: abstain,
            votes: BTreeMap::new(),
            executed: false,
            passed: false,
            executed_at: None,
            created_at: 100,
        }
    }

    #[test]
    fn test_task_status_transitions() {
        assert!(TaskStatus::Open.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Open.can_transition_to(TaskStatus::Closed));
        assert!(!TaskStatus::Closed.can_transition_to(TaskStatus::Open));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Closed));
        assert!(!TaskStatus::Open.can_transition_to(TaskStatus::Open));
    }

    #[test]
    fn test_proposal_status_follows_window() {
        let p = proposal(10, 5, 0);
        assert_eq!(p.status_at(50, None), ProposalStatus::Pending);
        assert_eq!(p.status_at(100, None), ProposalStatus::Active);
        assert_eq!(p.status_at(199, None), ProposalStatus::Active);
        assert_eq!(p.status_at(200, None), ProposalStatus::Passed);
        assert_eq!(proposal(5, 5, 0).status_at(200, None), ProposalStatus::Failed);
    }

    #[test]
    fn test_proposal_quorum() {
        let p = proposal(10, 5, 5);
        assert!(p.tally_passes(Some(20)));
        assert!(!p.tally_passes(Some(21)));
    }

    #[test]
    fn test_member_tier_ordering() {
        assert!(MemberTier::Advanced > MemberTier::Basic);
        assert!(MemberTier::Basic > MemberTier::None);
        assert_eq!(MemberTier::Expert.to_string(), "expert");
    }

    #[test]
    fn test_proposal_call_serialization() {
        let call = ProposalCall::CloseTask { task_id: 4 };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["type"], "close_task");
        assert_eq!(json["task_id"], 4);
    }
}
