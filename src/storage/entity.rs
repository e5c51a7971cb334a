//! Tagged records and entity metadata
//!
//! Every stored value is a [`Record`]. Decoding checks the tag against the
//! expected kind and re-runs [`Entity::validate`], so a malformed or
//! mismatched value surfaces as `StorageError::InvalidData` instead of a
//! half-initialised struct.

use super::{keys, StorageError, StorageResult};
use crate::core::{
    Actor, Balance, Dataset, FaucetUsage, Proposal, Review, RewardPool, Submission, Task,
    TokenSupply, VoteSupport,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Record {
    Actor(Actor),
    Task(Task),
    Submission(Submission),
    Review(Review),
    Dataset(Dataset),
    Proposal(Proposal),
    Balance(Balance),
    RewardPool(RewardPool),
    TokenSupply(TokenSupply),
    FaucetUsage(FaucetUsage),
    Sequence { next: u64 },
    ContentRef { cid: String },
    Index { target: String },
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Actor(_) => "actor",
            Record::Task(_) => "task",
            Record::Submission(_) => "submission",
            Record::Review(_) => "review",
            Record::Dataset(_) => "dataset",
            Record::Proposal(_) => "proposal",
            Record::Balance(_) => "balance",
            Record::RewardPool(_) => "reward_pool",
            Record::TokenSupply(_) => "token_supply",
            Record::FaucetUsage(_) => "faucet_usage",
            Record::Sequence { .. } => "sequence",
            Record::ContentRef { .. } => "content_ref",
            Record::Index { .. } => "index",
        }
    }

    pub fn encode(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(key: &str, bytes: &[u8]) -> StorageResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| StorageError::InvalidData(format!("{}: {}", key, e)))
    }
}

/// Secondary index entry derived from an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    pub key: String,
}

impl IndexKey {
    pub fn plain(key: String) -> Self {
        Self { key }
    }
}

pub trait Entity: Clone + Sized {
    const KIND: &'static str;
    /// Prefix shared by every primary key of this kind.
    const PREFIX: &'static str;

    fn primary_key(&self) -> String;

    fn index_keys(&self) -> Vec<IndexKey> {
        Vec::new()
    }

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn into_record(self) -> Record;

    fn from_record(record: Record) -> Option<Self>;

    fn encode(&self) -> StorageResult<Vec<u8>> {
        self.validate()
            .map_err(|e| StorageError::InvalidData(format!("{} {}: {}", Self::KIND, self.primary_key(), e)))?;
        self.clone().into_record().encode()
    }

    fn decode(key: &str, bytes: &[u8]) -> StorageResult<Self> {
        let record = Record::decode(key, bytes)?;
        let found = record.kind();
        let entity = Self::from_record(record).ok_or_else(|| {
            StorageError::InvalidData(format!("{} holds a {}, expected {}", key, found, Self::KIND))
        })?;
        entity
            .validate()
            .map_err(|e| StorageError::InvalidData(format!("{}: {}", key, e)))?;
        Ok(entity)
    }
}

macro_rules! record_variant {
    ($ty:ident) => {
        fn into_record(self) -> Record {
            Record::$ty(self)
        }

        fn from_record(record: Record) -> Option<Self> {
            match record {
                Record::$ty(inner) => Some(inner),
                _ => None,
            }
        }
    };
}

impl Entity for Actor {
    const KIND: &'static str = "actor";
    const PREFIX: &'static str = keys::ACTORS;

    fn primary_key(&self) -> String {
        keys::actor(&self.address)
    }

    record_variant!(Actor);
}

impl Entity for Task {
    const KIND: &'static str = "task";
    const PREFIX: &'static str = keys::TASKS;

    fn primary_key(&self) -> String {
        keys::task(self.id)
    }

    fn index_keys(&self) -> Vec<IndexKey> {
        vec![
            IndexKey::plain(keys::index_entry(
                keys::TASKS_BY_CREATOR,
                self.creator.as_str(),
                self.id,
            )),
            IndexKey::plain(keys::index_entry(
                keys::TASKS_BY_STATUS,
                self.status.as_str(),
                self.id,
            )),
        ]
    }

    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.required_submissions == 0 || self.required_validations == 0 {
            return Err("required counts must be positive".to_string());
        }
        if self.approved_count + self.rejected_count > self.submission_count {
            return Err("decided submissions exceed submission count".to_string());
        }
        Ok(())
    }

    record_variant!(Task);
}

impl Entity for Submission {
    const KIND: &'static str = "submission";
    const PREFIX: &'static str = keys::SUBMISSIONS;

    fn primary_key(&self) -> String {
        keys::submission(self.id)
    }

    fn index_keys(&self) -> Vec<IndexKey> {
        vec![
            IndexKey::plain(keys::index_entry(
                keys::TASK_SUBMISSIONS,
                &keys::id_segment(self.task_id),
                self.id,
            )),
            IndexKey::plain(keys::index_entry(
                keys::SUBMISSIONS_BY_SUBMITTER,
                self.submitter.as_str(),
                self.id,
            )),
        ]
    }

    fn validate(&self) -> Result<(), String> {
        if self.content_reference.trim().is_empty() {
            return Err("content reference is empty".to_string());
        }
        Ok(())
    }

    record_variant!(Submission);
}

impl Entity for Review {
    const KIND: &'static str = "review";
    const PREFIX: &'static str = keys::REVIEWS;

    fn primary_key(&self) -> String {
        keys::review(self.id)
    }

    fn index_keys(&self) -> Vec<IndexKey> {
        vec![
            IndexKey::plain(keys::index_entry(
                keys::SUBMISSION_REVIEWS,
                &keys::id_segment(self.submission_id),
                self.id,
            )),
            IndexKey::plain(keys::index_entry(
                keys::REVIEWS_BY_REVIEWER,
                self.reviewer.as_str(),
                self.id,
            )),
        ]
    }

    record_variant!(Review);
}

/// Claim taken by the first review a reviewer leaves on a submission.
///
/// Not derived from the review, so deleting the review leaves it in place.
pub fn review_guard_key(submission_id: u64, reviewer: &crate::core::Address) -> String {
    format!(
        "{}{}",
        keys::index_prefix(keys::REVIEW_GUARD, &keys::id_segment(submission_id)),
        reviewer
    )
}

impl Entity for Dataset {
    const KIND: &'static str = "dataset";
    const PREFIX: &'static str = keys::DATASETS;

    fn primary_key(&self) -> String {
        keys::dataset(self.id)
    }

    fn index_keys(&self) -> Vec<IndexKey> {
        vec![
            IndexKey::plain(keys::index_entry(
                keys::USER_DATASETS,
                self.owner.as_str(),
                self.id,
            )),
            IndexKey::plain(keys::index_entry(
                keys::DATASETS_BY_CATEGORY,
                &keys::scope(&self.category),
                self.id,
            )),
        ]
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is empty".to_string());
        }
        let total: u32 = self
            .reward_recipients
            .iter()
            .map(|r| r.share_percentage as u32)
            .sum();
        if total > 100 {
            return Err(format!("reward shares add up to {}%", total));
        }
        Ok(())
    }

    record_variant!(Dataset);
}

impl Entity for Proposal {
    const KIND: &'static str = "proposal";
    const PREFIX: &'static str = keys::PROPOSALS;

    fn primary_key(&self) -> String {
        keys::proposal(self.id)
    }

    fn index_keys(&self) -> Vec<IndexKey> {
        vec![IndexKey::plain(keys::index_entry(
            keys::PROPOSALS_BY_PROPOSER,
            self.proposer.as_str(),
            self.id,
        ))]
    }

    fn validate(&self) -> Result<(), String> {
        if self.end_time <= self.start_time {
            return Err("voting window is empty".to_string());
        }
        let sum = |support: VoteSupport| -> u64 {
            self.votes
                .values()
                .filter(|v| v.support == support)
                .map(|v| v.weight)
                .sum()
        };
        if sum(VoteSupport::For) != self.yes_votes
            || sum(VoteSupport::Against) != self.no_votes
            || sum(VoteSupport::Abstain) != self.abstain_votes
        {
            return Err("tallies do not match recorded votes".to_string());
        }
        Ok(())
    }

    record_variant!(Proposal);
}

impl Entity for Balance {
    const KIND: &'static str = "balance";
    const PREFIX: &'static str = keys::BALANCES;

    fn primary_key(&self) -> String {
        keys::balance(&self.address)
    }

    record_variant!(Balance);
}

impl Entity for RewardPool {
    const KIND: &'static str = "reward_pool";
    const PREFIX: &'static str = keys::REWARD_POOLS;

    fn primary_key(&self) -> String {
        keys::reward_pool(self.task_id)
    }

    fn validate(&self) -> Result<(), String> {
        let out = self.disbursed.checked_add(self.refunded).and_then(|v| v.checked_add(self.balance));
        if out != Some(self.funded) {
            return Err("pool accounting does not balance".to_string());
        }
        Ok(())
    }

    record_variant!(RewardPool);
}

impl Entity for TokenSupply {
    const KIND: &'static str = "token_supply";
    const PREFIX: &'static str = keys::TOKEN_SUPPLY;

    fn primary_key(&self) -> String {
        keys::TOKEN_SUPPLY.to_string()
    }

    record_variant!(TokenSupply);
}

impl Entity for FaucetUsage {
    const KIND: &'static str = "faucet_usage";
    const PREFIX: &'static str = keys::FAUCET;

    fn primary_key(&self) -> String {
        keys::faucet(&self.address)
    }

    record_variant!(FaucetUsage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, Bytes32, SubmissionStatus};
    use std::collections::BTreeMap;

    fn submission() -> Submission {
        Submission {
            id: 5,
            task_id: 2,
            submitter: Address::system("alice"),
            content_reference: "bafy-labels".to_string(),
            content_key: Bytes32::from_cid("bafy-labels"),
            is_encrypted: false,
            status: SubmissionStatus::Pending,
            approvals: 0,
            rejections: 0,
            metadata: BTreeMap::new(),
            created_at: 10,
            decided_at: None,
        }
    }

    #[test]
    fn test_record_is_tagged() {
        let bytes = submission().encode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["kind"], "submission");
        assert_eq!(json["data"]["task_id"], 2);
    }

    #[test]
    fn test_decode_rejects_wrong_kind() {
        let bytes = submission().encode().unwrap();
        let err = Task::decode("tasks/1", &bytes).unwrap_err();
        assert!(err.to_string().contains("expected task"));
    }

    #[test]
    fn test_encode_validates() {
        let mut bad = submission();
        bad.content_reference = "  ".to_string();
        assert!(matches!(bad.encode(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_submission_index_keys() {
        let keys: Vec<String> = submission().index_keys().into_iter().map(|k| k.key).collect();
        assert_eq!(keys[0], "task_submissions/00000000000000000002/00000000000000000005");
        assert!(keys[1].starts_with("submissions_by_submitter/0x"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            Actor::decode("actors/x", b"not json"),
            Err(StorageError::InvalidData(_))
        ));
    }
}
