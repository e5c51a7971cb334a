//! End-to-end marketplace flows over the public API of `DataDao`.
//!
//! Accounts are funded through the faucet, the same path a test network uses.

use datadao::config::ConsensusPolicy;
use datadao::core::{
    MemberTier, SubmissionStatus, TaskStatus, TaskType, Visibility, VoteSupport,
};
use datadao::dao::{CreateTaskParams, ProposalParams};
use datadao::util::clock::ManualClock;
use datadao::{Address, Bytes32, DaoConfig, DaoError, DataDao, SqliteKv};
use std::sync::Arc;

// ============================================================================
// TEST HELPERS
// ============================================================================

const START: i64 = 1_700_000_000;
const DAY: i64 = 24 * 3600;

fn open_dao(config: DaoConfig) -> (DataDao, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START));
    let store = SqliteKv::open_in_memory().unwrap();
    (DataDao::new(Arc::new(store), clock.clone(), config), clock)
}

/// Generous faucet so one window covers every account in a scenario.
fn test_config() -> DaoConfig {
    let mut config = DaoConfig::default();
    config.faucet.max_requests_per_day = 5;
    config
}

fn funded(dao: &DataDao, name: &str, claims: u32) -> Address {
    let who = Address::system(name);
    for _ in 0..claims {
        dao.faucet().request(&who).unwrap();
    }
    who
}

fn labeling_task(deadline: i64) -> CreateTaskParams {
    CreateTaskParams {
        title: "Annotate traffic lights".to_string(),
        description: "One box per light".to_string(),
        task_type: TaskType::DataLabeling,
        reward_per_submission: 50,
        reward_per_review: 5,
        required_submissions: 2,
        required_validations: 1,
        deadline,
        visibility: Visibility::Public,
        access_conditions: None,
        content_reference: Some("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".to_string()),
        nominated_reviewers: vec![],
    }
}

// ============================================================================
// REWARD FLOW
// ============================================================================

#[test]
fn test_task_completes_and_pays_everyone() {
    let (dao, _clock) = open_dao(test_config());
    let creator = funded(&dao, "creator", 2);
    dao.membership().join_dao(&creator, 1_000, None).unwrap();
    let alice = funded(&dao, "alice", 1);
    let bob = funded(&dao, "bob", 1);

    let task = dao
        .tasks()
        .create_task(&creator, labeling_task(START + 7 * DAY))
        .unwrap();
    assert_eq!(task.escrowed, 110);
    assert_eq!(dao.token().balance_of(&creator).unwrap(), 890);

    let s1 = dao.tasks().submit_to_task(&alice, task.id, "bafy-alice", false).unwrap();
    let s2 = dao.tasks().submit_to_task(&bob, task.id, "bafy-bob", true).unwrap();

    let first = dao
        .reviews()
        .validate_submission(&creator, s1.id, true, Some("clean".to_string()))
        .unwrap();
    assert_eq!(first.submission.status, SubmissionStatus::Approved);
    assert_eq!(first.task.status, TaskStatus::Open);

    let second = dao.reviews().validate_submission(&creator, s2.id, true, None).unwrap();
    assert_eq!(second.task.status, TaskStatus::Completed);
    assert_eq!(second.task.approved_count, 2);

    assert_eq!(dao.token().balance_of(&alice).unwrap(), 1_050);
    assert_eq!(dao.token().balance_of(&bob).unwrap(), 1_050);
    // Two review rewards go back to the creator who reviewed
    assert_eq!(dao.token().balance_of(&creator).unwrap(), 900);

    let pool = dao.rewards().pool(task.id).unwrap().unwrap();
    assert_eq!(pool.disbursed, 110);
    assert_eq!(pool.balance, 0);

    assert_eq!(dao.membership().get(&creator).unwrap().reputation, 4);
    assert_eq!(dao.reviews().reviews_by_reviewer(&creator).unwrap().len(), 2);

    let err = dao
        .tasks()
        .submit_to_task(&alice, task.id, "bafy-late", false)
        .unwrap_err();
    assert!(matches!(err, DaoError::TaskNotOpen(_)));
}

#[test]
fn test_closing_refunds_unspent_escrow() {
    let (dao, clock) = open_dao(test_config());
    let creator = funded(&dao, "creator", 1);
    dao.membership().join_dao(&creator, 100, None).unwrap();
    let worker = funded(&dao, "worker", 1);

    let task = dao
        .tasks()
        .create_task(&creator, labeling_task(START + DAY))
        .unwrap();
    let sub = dao.tasks().submit_to_task(&worker, task.id, "bafy-w", false).unwrap();
    dao.reviews().validate_submission(&creator, sub.id, true, None).unwrap();
    assert_eq!(dao.token().balance_of(&creator).unwrap(), 900 - 110 + 5);

    // Anyone may close once the deadline passed
    clock.advance(DAY + 1);
    let closed = dao.tasks().close_task(&worker, task.id).unwrap();
    assert_eq!(closed.status, TaskStatus::Closed);
    assert_eq!(dao.token().balance_of(&creator).unwrap(), 900 - 110 + 5 + 55);
    assert_eq!(dao.rewards().pool(task.id).unwrap().unwrap().balance, 0);
}

#[test]
fn test_majority_consensus_needs_quorum_of_reviews() {
    let mut config = test_config();
    config.review.consensus = ConsensusPolicy::Majority;
    let (dao, _clock) = open_dao(config);

    let creator = funded(&dao, "creator", 1);
    dao.membership().join_dao(&creator, 100, None).unwrap();
    let r1 = Address::system("reviewer-1");
    let r2 = Address::system("reviewer-2");
    let worker = funded(&dao, "worker", 1);

    let mut params = labeling_task(START + DAY);
    params.required_submissions = 1;
    params.required_validations = 2;
    params.nominated_reviewers = vec![r1.clone(), r2.clone()];
    let task = dao.tasks().create_task(&creator, params).unwrap();

    let sub = dao.tasks().submit_to_task(&worker, task.id, "bafy-w", false).unwrap();
    let outcome = dao.reviews().validate_submission(&r1, sub.id, true, None).unwrap();
    assert_eq!(outcome.submission.status, SubmissionStatus::Pending);

    let outcome = dao.reviews().validate_submission(&r2, sub.id, false, None).unwrap();
    // One approval against one rejection is a tie, which rejects
    assert_eq!(outcome.submission.status, SubmissionStatus::Rejected);
    assert_eq!(dao.token().balance_of(&worker).unwrap(), 1_000);
    assert_eq!(dao.token().balance_of(&r1).unwrap(), 5);
    assert_eq!(dao.token().balance_of(&r2).unwrap(), 5);
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

#[test]
fn test_tier_upgrades_with_stake() {
    let (dao, _clock) = open_dao(test_config());
    let who = funded(&dao, "staker", 2);

    let actor = dao.membership().join_dao(&who, 500, Some("Staker".into())).unwrap();
    assert_eq!(actor.tier, MemberTier::Basic);

    let actor = dao.membership().stake_more(&who, 500).unwrap();
    assert_eq!(actor.tier, MemberTier::Advanced);
    assert_eq!(actor.staked_amount, 1_000);
    assert_eq!(dao.token().balance_of(&who).unwrap(), 1_000);

    let err = dao.membership().join_dao(&who, 10, None).unwrap_err();
    assert!(matches!(err, DaoError::AlreadyMember(_)));
    assert_eq!(dao.stats().unwrap().member_count, 1);
}

// ============================================================================
// GOVERNANCE
// ============================================================================

#[test]
fn test_stake_weighted_proposal_lifecycle() {
    let (dao, clock) = open_dao(test_config());
    let big = funded(&dao, "big", 1);
    dao.membership().join_dao(&big, 600, None).unwrap();
    let small = funded(&dao, "small", 1);
    dao.membership().join_dao(&small, 400, None).unwrap();

    let proposal = dao
        .governance()
        .propose(
            &big,
            ProposalParams {
                title: "Raise review rewards".into(),
                description: String::new(),
                proposal_type: Default::default(),
                calls: vec![],
            },
        )
        .unwrap();

    dao.governance().cast_vote(&big, proposal.id, VoteSupport::For).unwrap();
    dao.governance().cast_vote(&small, proposal.id, VoteSupport::Against).unwrap();
    let err = dao
        .governance()
        .cast_vote(&small, proposal.id, VoteSupport::For)
        .unwrap_err();
    assert!(matches!(err, DaoError::AlreadyVoted { .. }));

    let err = dao.governance().execute_proposal(&small, proposal.id).unwrap_err();
    assert!(matches!(err, DaoError::VotingNotEnded { .. }));

    clock.advance(dao.config().governance.voting_period_secs + 1);
    let executed = dao.governance().execute_proposal(&small, proposal.id).unwrap();
    assert!(executed.executed);
    assert!(executed.passed);
    assert_eq!(executed.yes_votes, 600);
    assert_eq!(executed.no_votes, 400);
}

// ============================================================================
// FAUCET
// ============================================================================

#[test]
fn test_faucet_rate_limit_resets_after_window() {
    let (dao, clock) = open_dao(DaoConfig::default());
    let who = Address::system("tester");

    let claim = dao.faucet().request(&who).unwrap();
    assert_eq!(claim.balance, 1_000);
    assert_eq!(claim.requests_remaining, 0);
    assert_eq!(claim.next_available_at, Some(START + DAY));

    clock.advance(3_600);
    match dao.faucet().request(&who).unwrap_err() {
        DaoError::RateLimited {
            retry_after_secs, ..
        } => assert_eq!(retry_after_secs, (DAY - 3_600) as u64),
        other => panic!("expected rate limit, got {:?}", other),
    }

    clock.advance(DAY);
    let claim = dao.faucet().request(&who).unwrap();
    assert_eq!(claim.balance, 2_000);
    assert_eq!(dao.faucet().status(None).unwrap().total_distributed, 2_000);
}

// ============================================================================
// CONTENT REFERENCES
// ============================================================================

#[test]
fn test_content_key_round_trip_at_packing_boundary() {
    let exact: String = "q".repeat(32);
    let key = Bytes32::from_cid(&exact);
    assert!(Bytes32::fits(&exact));
    assert_eq!(key.to_utf8_cid().unwrap(), exact);

    let long: String = "q".repeat(33);
    assert!(!Bytes32::fits(&long));
    assert_eq!(Bytes32::from_cid(&long), key);
}

#[test]
fn test_long_content_reference_is_resolvable() {
    let (dao, _clock) = open_dao(test_config());
    let creator = funded(&dao, "creator", 1);
    dao.membership().join_dao(&creator, 100, None).unwrap();

    let params = labeling_task(START + DAY);
    let cid = params.content_reference.clone().unwrap();
    let task = dao.tasks().create_task(&creator, params).unwrap();

    assert!(!task.content_key.is_zero());
    assert_eq!(dao.resolve_content(&task.content_key).unwrap(), Some(cid));
    assert_eq!(dao.resolve_content(&Bytes32::from_cid("unknown")).unwrap(), None);
}
