//! Key layout
//!
//! Primary records live under one prefix per kind. Index namespaces hold
//! entries of the form `{namespace}/{scope}/{id}` whose value points back at
//! the primary key. Numeric ids are zero padded so prefix scans come back in
//! id order.

use crate::core::{Address, Bytes32};

pub const ACTORS: &str = "actors/";
pub const TASKS: &str = "tasks/";
pub const SUBMISSIONS: &str = "submissions/";
pub const REVIEWS: &str = "reviews/";
pub const DATASETS: &str = "datasets/";
pub const PROPOSALS: &str = "proposals/";
pub const BALANCES: &str = "balances/";
pub const REWARD_POOLS: &str = "reward_pools/";
pub const FAUCET: &str = "faucet/";
pub const SEQUENCES: &str = "sequences/";
pub const CONTENT_REFS: &str = "content_refs/";
pub const TOKEN_SUPPLY: &str = "token_supply";

// Index namespaces
pub const TASK_SUBMISSIONS: &str = "task_submissions";
pub const SUBMISSION_REVIEWS: &str = "submission_reviews";
pub const USER_DATASETS: &str = "user_datasets";
pub const DATASETS_BY_CATEGORY: &str = "datasets_by_category";
pub const TASKS_BY_CREATOR: &str = "tasks_by_creator";
pub const TASKS_BY_STATUS: &str = "tasks_by_status";
pub const SUBMISSIONS_BY_SUBMITTER: &str = "submissions_by_submitter";
pub const REVIEWS_BY_REVIEWER: &str = "reviews_by_reviewer";
pub const PROPOSALS_BY_PROPOSER: &str = "proposals_by_proposer";
pub const REVIEW_GUARD: &str = "review_guard";

pub fn id_segment(id: u64) -> String {
    format!("{:020}", id)
}

pub fn actor(address: &Address) -> String {
    format!("{}{}", ACTORS, address)
}

pub fn task(id: u64) -> String {
    format!("{}{}", TASKS, id_segment(id))
}

pub fn submission(id: u64) -> String {
    format!("{}{}", SUBMISSIONS, id_segment(id))
}

pub fn review(id: u64) -> String {
    format!("{}{}", REVIEWS, id_segment(id))
}

pub fn dataset(id: u64) -> String {
    format!("{}{}", DATASETS, id_segment(id))
}

pub fn proposal(id: u64) -> String {
    format!("{}{}", PROPOSALS, id_segment(id))
}

pub fn balance(address: &Address) -> String {
    format!("{}{}", BALANCES, address)
}

pub fn reward_pool(task_id: u64) -> String {
    format!("{}{}", REWARD_POOLS, id_segment(task_id))
}

pub fn faucet(address: &Address) -> String {
    format!("{}{}", FAUCET, address)
}

pub fn sequence(name: &str) -> String {
    format!("{}{}", SEQUENCES, name)
}

pub fn content_ref(packed: &Bytes32) -> String {
    format!("{}{}", CONTENT_REFS, packed.to_hex())
}

/// Prefix listing every entry of `namespace` for one scope value.
pub fn index_prefix(namespace: &str, scope: &str) -> String {
    format!("{}/{}/", namespace, scope)
}

pub fn index_entry(namespace: &str, scope: &str, id: u64) -> String {
    format!("{}{}", index_prefix(namespace, scope), id_segment(id))
}

/// Index scopes are user supplied for categories; keep them free of the separator.
pub fn scope(raw: &str) -> String {
    raw.trim().to_lowercase().replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_sort_lexicographically() {
        assert!(task(9) < task(10));
        assert_eq!(task(1), "tasks/00000000000000000001");
    }

    #[test]
    fn test_index_entry_layout() {
        assert_eq!(
            index_entry(TASK_SUBMISSIONS, &id_segment(3), 7),
            "task_submissions/00000000000000000003/00000000000000000007"
        );
        assert!(index_entry(DATASETS_BY_CATEGORY, "images", 1)
            .starts_with(&index_prefix(DATASETS_BY_CATEGORY, "images")));
    }

    #[test]
    fn test_scope_normalization() {
        assert_eq!(scope(" Images/Medical "), "images_medical");
    }
}
