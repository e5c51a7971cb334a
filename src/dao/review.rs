//! Review and consensus
//!
//! A review settles in one commit: the review record, the reviewer's reward,
//! the submission decision (when consensus is reached), the submitter's
//! reward, reputation changes and task completion. Any failure, including an
//! exhausted reward pool, leaves all of it unwritten.

use super::{membership, rewards, tasks, DaoContext};
use crate::config::{ConsensusPolicy, ReviewerPolicy};
use crate::core::{
    Address, Review, ReviewId, Submission, SubmissionId, SubmissionStatus, Task, TaskStatus,
};
use crate::error::{DaoError, DaoResult};
use crate::storage::entity::review_guard_key;
use crate::storage::{keys, UnitOfWork};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Everything a review changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub review: Review,
    pub submission: Submission,
    pub task: Task,
}

/// Decision for a submission after its tallies were updated, if consensus is reached.
pub fn decide(
    policy: ConsensusPolicy,
    latest_approved: bool,
    approvals: u32,
    rejections: u32,
    quorum: u32,
) -> Option<SubmissionStatus> {
    let verdict = |approved: bool| {
        if approved {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Rejected
        }
    };
    match policy {
        ConsensusPolicy::FirstReview => Some(verdict(latest_approved)),
        ConsensusPolicy::Majority if approvals + rejections >= quorum => {
            Some(verdict(approvals > rejections))
        }
        ConsensusPolicy::Unanimous if approvals + rejections >= quorum => {
            Some(verdict(rejections == 0))
        }
        _ => None,
    }
}

fn authorize_reviewer(
    ctx: &DaoContext,
    uow: &mut UnitOfWork<'_>,
    task: &Task,
    submission: &Submission,
    caller: &Address,
) -> DaoResult<()> {
    if &submission.submitter == caller {
        return Err(DaoError::Unauthorized(format!(
            "{} cannot review their own submission {}",
            caller, submission.id
        )));
    }
    let allowed = match ctx.config.review.reviewer_policy {
        ReviewerPolicy::CreatorOrNominated => {
            &task.creator == caller || task.nominated_reviewers.contains(caller)
        }
        ReviewerPolicy::AnyMember => membership::require_member(uow, caller).is_ok(),
        ReviewerPolicy::Anyone => true,
    };
    if !allowed {
        return Err(DaoError::Unauthorized(format!(
            "{} is not a reviewer for task {}",
            caller, task.id
        )));
    }
    Ok(())
}

pub struct ReviewEngine {
    ctx: Arc<DaoContext>,
}

impl ReviewEngine {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    /// Approve or reject a pending submission.
    pub fn validate_submission(
        &self,
        caller: &Address,
        submission_id: SubmissionId,
        approved: bool,
        feedback: Option<String>,
    ) -> DaoResult<ReviewOutcome> {
        let ctx = self.ctx.as_ref();
        let reputation = &ctx.config.membership.reputation;

        ctx.execute("validate_submission", |uow, now| {
            let mut submission = tasks::load_submission(uow, submission_id)?;
            if submission.status != SubmissionStatus::Pending {
                return Err(DaoError::SubmissionNotPending(submission_id));
            }
            let mut task = tasks::load_task(uow, submission.task_id)?;
            if !task.is_open() {
                return Err(DaoError::TaskNotOpen(task.id));
            }
            authorize_reviewer(ctx, uow, &task, &submission, caller)?;
            let guard = review_guard_key(submission_id, caller);
            if uow.exists(&guard)? {
                return Err(DaoError::AlreadyReviewed {
                    submission_id,
                    reviewer: caller.clone(),
                });
            }

            let review_id = uow.next_id("reviews")?;
            let reward_paid =
                rewards::disburse(ctx, uow, task.id, caller, task.reward_per_review, "review")?;
            let review = Review {
                id: review_id,
                submission_id,
                task_id: task.id,
                reviewer: caller.clone(),
                approved,
                feedback,
                reward_paid,
                created_at: now,
                updated_at: now,
            };
            uow.insert(&review)?;
            uow.claim(&guard, &keys::review(review_id))?;
            membership::adjust_reputation(uow, caller, reputation.review_cast, now)?;

            if approved {
                submission.approvals += 1;
            } else {
                submission.rejections += 1;
            }

            let decision = decide(
                ctx.config.review.consensus,
                approved,
                submission.approvals,
                submission.rejections,
                task.required_validations,
            );
            if let Some(status) = decision {
                submission.status = status;
                submission.decided_at = Some(now);
                match status {
                    SubmissionStatus::Approved => {
                        task.approved_count += 1;
                        rewards::disburse(
                            ctx,
                            uow,
                            task.id,
                            &submission.submitter,
                            task.reward_per_submission,
                            "submission",
                        )?;
                        membership::adjust_reputation(
                            uow,
                            &submission.submitter,
                            reputation.approved_submission,
                            now,
                        )?;
                    }
                    SubmissionStatus::Rejected => {
                        task.rejected_count += 1;
                        membership::adjust_reputation(
                            uow,
                            &submission.submitter,
                            reputation.rejected_submission,
                            now,
                        )?;
                    }
                    SubmissionStatus::Pending => {}
                }
                info!(
                    submission_id,
                    task_id = task.id,
                    status = status.as_str(),
                    approvals = submission.approvals,
                    rejections = submission.rejections,
                    "Submission decided"
                );
            }
            uow.save(&submission)?;

            task.updated_at = now;
            if task.approved_count >= task.required_submissions {
                tasks::finish_task(uow, &mut task, TaskStatus::Completed, now)?;
            } else {
                uow.save(&task)?;
            }

            info!(
                review_id,
                submission_id,
                reviewer = %caller,
                approved,
                reward_paid,
                "Review recorded"
            );
            Ok(ReviewOutcome {
                review,
                submission,
                task,
            })
        })
    }

    pub fn update_review(
        &self,
        caller: &Address,
        review_id: ReviewId,
        feedback: Option<String>,
    ) -> DaoResult<Review> {
        self.ctx.execute("update_review", |uow, now| {
            let mut review = load_review(uow, review_id)?;
            if &review.reviewer != caller {
                return Err(DaoError::Unauthorized(format!(
                    "only the reviewer can edit review {}",
                    review_id
                )));
            }
            review.feedback = feedback;
            review.updated_at = now;
            uow.save(&review)?;
            Ok(review)
        })
    }

    /// Remove a review. Tallies of a still pending submission are rolled back;
    /// decided submissions and paid rewards stay as they are. The reviewer's
    /// claim on the submission is kept, so they cannot review it again.
    pub fn delete_review(&self, caller: &Address, review_id: ReviewId) -> DaoResult<()> {
        self.ctx.execute("delete_review", |uow, _now| {
            let review = load_review(uow, review_id)?;
            if &review.reviewer != caller && !self.ctx.config.is_admin(caller) {
                return Err(DaoError::Unauthorized(format!(
                    "{} cannot delete review {}",
                    caller, review_id
                )));
            }
            if let Some(mut submission) = uow.load::<Submission>(&keys::submission(review.submission_id))? {
                if submission.status == SubmissionStatus::Pending {
                    if review.approved {
                        submission.approvals = submission.approvals.saturating_sub(1);
                    } else {
                        submission.rejections = submission.rejections.saturating_sub(1);
                    }
                    uow.save(&submission)?;
                }
            }
            uow.remove(&review)?;
            info!(review_id, submission_id = review.submission_id, "Review deleted");
            Ok(())
        })
    }

    // ==================== Queries ====================

    pub fn get_review(&self, review_id: ReviewId) -> DaoResult<Review> {
        self.ctx
            .repo::<Review>()
            .get(&keys::review(review_id))?
            .ok_or_else(|| DaoError::not_found("Review", review_id))
    }

    pub fn list_reviews(&self) -> DaoResult<Vec<Review>> {
        Ok(self.ctx.repo::<Review>().list()?)
    }

    pub fn reviews_for_submission(&self, submission_id: SubmissionId) -> DaoResult<Vec<Review>> {
        let prefix = keys::index_prefix(keys::SUBMISSION_REVIEWS, &keys::id_segment(submission_id));
        Ok(self.ctx.repo::<Review>().list_indexed(&prefix)?)
    }

    pub fn reviews_by_reviewer(&self, reviewer: &Address) -> DaoResult<Vec<Review>> {
        let prefix = keys::index_prefix(keys::REVIEWS_BY_REVIEWER, reviewer.as_str());
        Ok(self.ctx.repo::<Review>().list_indexed(&prefix)?)
    }
}

fn load_review(uow: &mut UnitOfWork<'_>, review_id: ReviewId) -> DaoResult<Review> {
    uow.load::<Review>(&keys::review(review_id))?
        .ok_or_else(|| DaoError::not_found("Review", review_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaoConfig;
    use crate::core::TaskId;
    use crate::dao::testing::{addr, harness, harness_with, member, task_params, START};
    use crate::dao::DataDao;

    fn open_task(dao: &DataDao, creator: &Address, required_submissions: u32, required_validations: u32) -> TaskId {
        let mut params = task_params(START + 3600);
        params.required_submissions = required_submissions;
        params.required_validations = required_validations;
        dao.tasks().create_task(creator, params).unwrap().id
    }

    fn submit(dao: &DataDao, task_id: TaskId, who: &str) -> SubmissionId {
        dao.tasks()
            .submit_to_task(&addr(who), task_id, &format!("bafy-{}", who), false)
            .unwrap()
            .id
    }

    #[test]
    fn test_decide_policies() {
        use ConsensusPolicy::*;
        assert_eq!(decide(FirstReview, false, 0, 1, 3), Some(SubmissionStatus::Rejected));
        assert_eq!(decide(Majority, true, 1, 0, 2), None);
        assert_eq!(decide(Majority, true, 2, 1, 3), Some(SubmissionStatus::Approved));
        assert_eq!(decide(Majority, false, 1, 1, 2), Some(SubmissionStatus::Rejected));
        assert_eq!(decide(Unanimous, true, 2, 1, 3), Some(SubmissionStatus::Rejected));
        assert_eq!(decide(Unanimous, true, 3, 0, 3), Some(SubmissionStatus::Approved));
    }

    #[test]
    fn test_first_review_decides_and_pays() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 1, 1);
        let submission_id = submit(&dao, task_id, "worker");

        let outcome = dao
            .reviews()
            .validate_submission(&creator, submission_id, true, Some("clean labels".into()))
            .unwrap();

        assert_eq!(outcome.submission.status, SubmissionStatus::Approved);
        assert_eq!(outcome.task.status, TaskStatus::Completed);
        assert_eq!(outcome.task.approved_count, 1);
        assert!(outcome.task.completed_at.is_some());
        assert_eq!(outcome.review.reward_paid, 5);
        assert_eq!(dao.token().balance_of(&addr("worker")).unwrap(), 50);
        // 1000 - 100 stake - 55 escrow + 5 review reward, nothing left to refund
        assert_eq!(dao.token().balance_of(&creator).unwrap(), 850);
    }

    #[test]
    fn test_duplicate_reviewer_is_conflict() {
        let mut config = DaoConfig::default();
        config.review.consensus = ConsensusPolicy::Majority;
        let (dao, _clock) = harness_with(config);
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 1, 2);
        let submission_id = submit(&dao, task_id, "worker");

        dao.reviews()
            .validate_submission(&creator, submission_id, true, None)
            .unwrap();
        let err = dao
            .reviews()
            .validate_submission(&creator, submission_id, true, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::AlreadyReviewed { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::StateConflict);
        assert_eq!(dao.reviews().reviews_for_submission(submission_id).unwrap().len(), 1);
    }

    #[test]
    fn test_decided_submission_rejects_further_reviews() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 2, 1);
        let submission_id = submit(&dao, task_id, "worker");

        dao.reviews()
            .validate_submission(&creator, submission_id, false, None)
            .unwrap();
        let err = dao
            .reviews()
            .validate_submission(&creator, submission_id, true, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::SubmissionNotPending(_)));

        let task = dao.tasks().get_task(task_id).unwrap();
        assert_eq!(task.rejected_count, 1);
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn test_completion_exactly_at_threshold() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 2, 1);
        let first = submit(&dao, task_id, "w1");
        let second = submit(&dao, task_id, "w2");
        let third = submit(&dao, task_id, "w3");

        dao.reviews().validate_submission(&creator, first, true, None).unwrap();
        assert_eq!(dao.tasks().get_task(task_id).unwrap().status, TaskStatus::Open);

        let outcome = dao.reviews().validate_submission(&creator, second, true, None).unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Completed);
        assert_eq!(outcome.task.approved_count, 2);

        let err = dao.reviews().validate_submission(&creator, third, true, None).unwrap_err();
        assert!(matches!(err, DaoError::TaskNotOpen(_)));
    }

    #[test]
    fn test_majority_waits_for_quorum() {
        let mut config = DaoConfig::default();
        config.review.consensus = ConsensusPolicy::Majority;
        let (dao, _clock) = harness_with(config);
        let creator = member(&dao, "creator", 1_000, 100);
        let mut params = task_params(START + 3600);
        params.required_submissions = 1;
        params.required_validations = 3;
        params.nominated_reviewers = vec![addr("r1"), addr("r2")];
        let task_id = dao.tasks().create_task(&creator, params).unwrap().id;
        let submission_id = submit(&dao, task_id, "worker");

        let first = dao.reviews().validate_submission(&addr("r1"), submission_id, true, None).unwrap();
        assert_eq!(first.submission.status, SubmissionStatus::Pending);
        let second = dao.reviews().validate_submission(&addr("r2"), submission_id, false, None).unwrap();
        assert_eq!(second.submission.status, SubmissionStatus::Pending);
        let third = dao.reviews().validate_submission(&creator, submission_id, true, None).unwrap();
        assert_eq!(third.submission.status, SubmissionStatus::Approved);
        assert_eq!(third.task.status, TaskStatus::Completed);

        for reviewer in ["r1", "r2"] {
            assert_eq!(dao.token().balance_of(&addr(reviewer)).unwrap(), 5);
        }
    }

    #[test]
    fn test_unauthorized_reviewers() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 1, 1);
        let submission_id = submit(&dao, task_id, "creator");

        let err = dao
            .reviews()
            .validate_submission(&addr("stranger"), submission_id, true, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::Unauthorized(_)));

        let own = dao
            .reviews()
            .validate_submission(&creator, submission_id, true, None)
            .unwrap_err();
        assert!(matches!(own, DaoError::Unauthorized(_)));
    }

    #[test]
    fn test_exhausted_pool_reverts_review() {
        let mut config = DaoConfig::default();
        config.rewards.escrow_on_create = false;
        let (dao, _clock) = harness_with(config);
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 1, 1);
        let submission_id = submit(&dao, task_id, "worker");

        let err = dao
            .reviews()
            .validate_submission(&creator, submission_id, true, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::PoolExhausted { .. }));
        assert_eq!(
            dao.tasks().get_submission(submission_id).unwrap().status,
            SubmissionStatus::Pending
        );
        assert!(dao.reviews().list_reviews().unwrap().is_empty());
    }

    #[test]
    fn test_reputation_updates() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let worker = member(&dao, "worker", 1_000, 100);
        let task_id = open_task(&dao, &creator, 2, 1);
        let submission_id = submit(&dao, task_id, "worker");

        dao.reviews().validate_submission(&creator, submission_id, true, None).unwrap();
        assert_eq!(dao.membership().get(&worker).unwrap().reputation, 10);
        assert_eq!(dao.membership().get(&creator).unwrap().reputation, 2);
    }

    #[test]
    fn test_delete_review_rolls_back_pending_tally() {
        let mut config = DaoConfig::default();
        config.review.consensus = ConsensusPolicy::Majority;
        let (dao, _clock) = harness_with(config);
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 1, 2);
        let submission_id = submit(&dao, task_id, "worker");

        let outcome = dao.reviews().validate_submission(&creator, submission_id, true, None).unwrap();
        dao.reviews().delete_review(&creator, outcome.review.id).unwrap();

        let submission = dao.tasks().get_submission(submission_id).unwrap();
        assert_eq!(submission.approvals, 0);
        assert!(dao.reviews().reviews_by_reviewer(&creator).unwrap().is_empty());
    }

    #[test]
    fn test_deleted_review_cannot_be_cast_again() {
        let mut config = DaoConfig::default();
        config.review.consensus = ConsensusPolicy::Majority;
        let (dao, _clock) = harness_with(config);
        let creator = member(&dao, "creator", 1_000, 100);
        let mut params = task_params(START + 3600);
        params.required_submissions = 1;
        params.required_validations = 2;
        params.nominated_reviewers = vec![addr("r1")];
        let task_id = dao.tasks().create_task(&creator, params).unwrap().id;
        let submission_id = submit(&dao, task_id, "worker");

        let outcome = dao
            .reviews()
            .validate_submission(&addr("r1"), submission_id, true, None)
            .unwrap();
        dao.reviews().delete_review(&addr("r1"), outcome.review.id).unwrap();

        let err = dao
            .reviews()
            .validate_submission(&addr("r1"), submission_id, true, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::AlreadyReviewed { .. }));
        assert_eq!(dao.token().balance_of(&addr("r1")).unwrap(), 5);
        assert_eq!(dao.rewards().pool(task_id).unwrap().unwrap().balance, 55);
    }

    #[test]
    fn test_update_review_feedback() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task_id = open_task(&dao, &creator, 2, 1);
        let submission_id = submit(&dao, task_id, "worker");
        let outcome = dao.reviews().validate_submission(&creator, submission_id, true, None).unwrap();

        let updated = dao
            .reviews()
            .update_review(&creator, outcome.review.id, Some("good".into()))
            .unwrap();
        assert_eq!(updated.feedback.as_deref(), Some("good"));
        assert!(dao.reviews().update_review(&addr("other"), outcome.review.id, None).is_err());
    }
}
