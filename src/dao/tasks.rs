//! Task lifecycle
//!
//! ```text
//! Open ──(approved == required_submissions)──▶ Completed
//!   └───(creator / admin / governance, or anyone after the deadline)──▶ Closed
//! ```
//!
//! Both exits are terminal. Expiry is observed, not scheduled: a task past its
//! deadline keeps status Open until someone closes it, but rejects new
//! submissions.

use super::{membership, record_content, rewards, DaoContext};
use crate::core::{
    Address, Amount, Bytes32, Review, Submission, SubmissionId, SubmissionStatus, Task, TaskId,
    TaskStatus, TaskType, Timestamp, Visibility,
};
use crate::error::{DaoError, DaoResult};
use crate::storage::{keys, UnitOfWork};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskParams {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub task_type: TaskType,
    pub reward_per_submission: Amount,
    pub reward_per_review: Amount,
    pub required_submissions: u32,
    pub required_validations: u32,
    pub deadline: Timestamp,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub access_conditions: Option<String>,
    #[serde(default)]
    pub content_reference: Option<String>,
    #[serde(default)]
    pub nominated_reviewers: Vec<Address>,
}

/// Fields the creator may change while the task is open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub nominated_reviewers: Option<Vec<Address>>,
    /// Later deadline; shortening is not allowed
    pub deadline: Option<Timestamp>,
}

/// Metadata entries to merge into a submission. Empty values remove the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionUpdate {
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn has_access_conditions(conditions: &Option<String>) -> bool {
    conditions
        .as_deref()
        .map(|c| !c.trim().is_empty())
        .unwrap_or(false)
}

pub(crate) fn validate_params(params: &CreateTaskParams, now: Timestamp, max_title_len: usize) -> DaoResult<()> {
    let invalid = |msg: &str| Err(DaoError::InvalidParameters(msg.to_string()));

    if params.title.trim().is_empty() {
        return invalid("title is required");
    }
    if params.title.chars().count() > max_title_len {
        return Err(DaoError::InvalidParameters(format!(
            "title exceeds {} characters",
            max_title_len
        )));
    }
    if params.reward_per_submission == 0 || params.reward_per_review == 0 {
        return invalid("rewards must be positive");
    }
    if params.required_submissions == 0 {
        return invalid("required_submissions must be at least 1");
    }
    if params.required_validations == 0 {
        return invalid("required_validations must be at least 1");
    }
    if params.deadline <= now {
        return invalid("deadline must be in the future");
    }
    if params.visibility != Visibility::Public && !has_access_conditions(&params.access_conditions) {
        return invalid("non-public tasks require access conditions");
    }
    Ok(())
}

pub(crate) fn load_task(uow: &mut UnitOfWork<'_>, task_id: TaskId) -> DaoResult<Task> {
    uow.load::<Task>(&keys::task(task_id))?
        .ok_or_else(|| DaoError::not_found("Task", task_id))
}

pub(crate) fn load_submission(uow: &mut UnitOfWork<'_>, id: SubmissionId) -> DaoResult<Submission> {
    uow.load::<Submission>(&keys::submission(id))?
        .ok_or_else(|| DaoError::not_found("Submission", id))
}

/// Move an open task to a terminal status and return its unused escrow.
pub(crate) fn finish_task(
    uow: &mut UnitOfWork<'_>,
    task: &mut Task,
    status: TaskStatus,
    now: Timestamp,
) -> DaoResult<()> {
    if !task.status.can_transition_to(status) {
        return Err(DaoError::TaskNotOpen(task.id));
    }
    task.status = status;
    task.updated_at = now;
    match status {
        TaskStatus::Completed => task.completed_at = Some(now),
        TaskStatus::Closed => task.closed_at = Some(now),
        TaskStatus::Open => {}
    }
    let refunded = rewards::refund_pool(uow, task.id, &task.creator)?;
    uow.save(&*task)?;
    info!(task_id = task.id, status = %status, refunded, "Task finished");
    Ok(())
}

/// Close on behalf of governance; no caller check.
pub(crate) fn close_by_governance(uow: &mut UnitOfWork<'_>, task_id: TaskId, now: Timestamp) -> DaoResult<Task> {
    let mut task = load_task(uow, task_id)?;
    finish_task(uow, &mut task, TaskStatus::Closed, now)?;
    Ok(task)
}

fn remove_submission(uow: &mut UnitOfWork<'_>, submission: &Submission) -> DaoResult<()> {
    let prefix = keys::index_prefix(keys::SUBMISSION_REVIEWS, &keys::id_segment(submission.id));
    for review in uow.load_indexed::<Review>(&prefix)? {
        uow.remove(&review)?;
    }
    uow.remove(submission)?;
    Ok(())
}

pub struct TaskManager {
    ctx: Arc<DaoContext>,
}

impl TaskManager {
    pub fn new(ctx: Arc<DaoContext>) -> Self {
        Self { ctx }
    }

    pub fn create_task(&self, caller: &Address, params: CreateTaskParams) -> DaoResult<Task> {
        let config = &self.ctx.config;
        self.ctx.execute("create_task", |uow, now| {
            validate_params(&params, now, config.tasks.max_title_len)?;

            let actor = membership::require_member(uow, caller)?;
            if actor.tier < config.tasks.min_creator_tier {
                return Err(DaoError::Unauthorized(format!(
                    "creating tasks requires tier {}, {} is {}",
                    config.tasks.min_creator_tier, caller, actor.tier
                )));
            }

            let budget = rewards::reward_budget(
                params.reward_per_submission,
                params.reward_per_review,
                params.required_submissions,
                params.required_validations,
            )
            .ok_or_else(|| DaoError::InvalidParameters("reward budget overflows".to_string()))?;

            let id = uow.next_id("tasks")?;
            let content_key = match &params.content_reference {
                Some(cid) => record_content(uow, cid)?,
                None => Bytes32::ZERO,
            };
            let escrowed = if config.rewards.escrow_on_create {
                rewards::fund_pool(uow, id, caller, budget)?;
                budget
            } else {
                0
            };

            let task = Task {
                id,
                creator: caller.clone(),
                title: params.title.trim().to_string(),
                description: params.description,
                task_type: params.task_type,
                reward_per_submission: params.reward_per_submission,
                reward_per_review: params.reward_per_review,
                required_submissions: params.required_submissions,
                required_validations: params.required_validations,
                deadline: params.deadline,
                visibility: params.visibility,
                access_conditions: params.access_conditions,
                content_reference: params.content_reference,
                content_key,
                status: TaskStatus::Open,
                nominated_reviewers: params.nominated_reviewers.into_iter().collect(),
                submission_count: 0,
                approved_count: 0,
                rejected_count: 0,
                escrowed,
                created_at: now,
                updated_at: now,
                completed_at: None,
                closed_at: None,
            };
            uow.insert(&task)?;

            info!(
                task_id = id,
                creator = %caller,
                task_type = ?task.task_type,
                escrowed,
                deadline = task.deadline,
                "Task created"
            );
            Ok(task)
        })
    }

    pub fn submit_to_task(
        &self,
        caller: &Address,
        task_id: TaskId,
        content_reference: &str,
        is_encrypted: bool,
    ) -> DaoResult<Submission> {
        if content_reference.trim().is_empty() {
            return Err(DaoError::InvalidParameters(
                "content_reference is required".to_string(),
            ));
        }

        self.ctx.execute("submit_to_task", |uow, now| {
            let mut task = load_task(uow, task_id)?;
            if !task.is_open() {
                return Err(DaoError::TaskNotOpen(task_id));
            }
            if task.deadline_passed(now) {
                return Err(DaoError::DeadlinePassed {
                    task_id,
                    deadline: task.deadline,
                });
            }

            let id = uow.next_id("submissions")?;
            let content_key = record_content(uow, content_reference)?;
            let submission = Submission {
                id,
                task_id,
                submitter: caller.clone(),
                content_reference: content_reference.to_string(),
                content_key,
                is_encrypted,
                status: SubmissionStatus::Pending,
                approvals: 0,
                rejections: 0,
                metadata: BTreeMap::new(),
                created_at: now,
                decided_at: None,
            };
            uow.insert(&submission)?;

            task.submission_count += 1;
            task.updated_at = now;
            uow.save(&task)?;

            info!(task_id, submission_id = id, submitter = %caller, "Submission received");
            Ok(submission)
        })
    }

    pub fn close_task(&self, caller: &Address, task_id: TaskId) -> DaoResult<Task> {
        self.ctx.execute("close_task", |uow, now| {
            let mut task = load_task(uow, task_id)?;
            let privileged = &task.creator == caller || self.ctx.config.is_admin(caller);
            if !privileged && !task.deadline_passed(now) {
                return Err(DaoError::Unauthorized(format!(
                    "only the creator can close task {} before its deadline",
                    task_id
                )));
            }
            finish_task(uow, &mut task, TaskStatus::Closed, now)?;
            info!(task_id, by = %caller, "Task closed");
            Ok(task)
        })
    }

    /// Top up the reward pool of an open task from the creator's balance.
    pub fn fund_task(&self, caller: &Address, task_id: TaskId, amount: Amount) -> DaoResult<Task> {
        if amount == 0 {
            return Err(DaoError::InvalidParameters("amount must be positive".to_string()));
        }

        self.ctx.execute("fund_task", |uow, now| {
            let mut task = load_task(uow, task_id)?;
            if &task.creator != caller {
                return Err(DaoError::Unauthorized(format!(
                    "only the creator can fund task {}",
                    task_id
                )));
            }
            if !task.is_open() {
                return Err(DaoError::TaskNotOpen(task_id));
            }

            let pool = rewards::fund_pool(uow, task_id, caller, amount)?;
            task.escrowed = task.escrowed.saturating_add(amount);
            task.updated_at = now;
            uow.save(&task)?;

            info!(task_id, amount, pool_balance = pool.balance, "Task funded");
            Ok(task)
        })
    }

    pub fn update_task(&self, caller: &Address, task_id: TaskId, update: TaskUpdate) -> DaoResult<Task> {
        self.ctx.execute("update_task", |uow, now| {
            let mut task = load_task(uow, task_id)?;
            if &task.creator != caller {
                return Err(DaoError::Unauthorized(format!(
                    "only the creator can update task {}",
                    task_id
                )));
            }
            if !task.is_open() {
                return Err(DaoError::TaskNotOpen(task_id));
            }

            if let Some(title) = update.title {
                if title.trim().is_empty() {
                    return Err(DaoError::InvalidParameters("title is required".to_string()));
                }
                task.title = title.trim().to_string();
            }
            if let Some(description) = update.description {
                task.description = description;
            }
            if let Some(reviewers) = update.nominated_reviewers {
                task.nominated_reviewers = reviewers.into_iter().collect::<BTreeSet<_>>();
            }
            if let Some(deadline) = update.deadline {
                if deadline < task.deadline || deadline <= now {
                    return Err(DaoError::InvalidParameters(
                        "deadline can only be extended into the future".to_string(),
                    ));
                }
                task.deadline = deadline;
            }
            task.updated_at = now;
            uow.save(&task)?;

            info!(task_id, "Task updated");
            Ok(task)
        })
    }

    /// Delete a task with its submissions and reviews; unused escrow goes back to the creator.
    pub fn delete_task(&self, caller: &Address, task_id: TaskId) -> DaoResult<()> {
        self.ctx.execute("delete_task", |uow, _now| {
            let task = load_task(uow, task_id)?;
            if &task.creator != caller && !self.ctx.config.is_admin(caller) {
                return Err(DaoError::Unauthorized(format!(
                    "only the creator can delete task {}",
                    task_id
                )));
            }

            let prefix = keys::index_prefix(keys::TASK_SUBMISSIONS, &keys::id_segment(task_id));
            let submissions = uow.load_indexed::<Submission>(&prefix)?;
            for submission in &submissions {
                remove_submission(uow, submission)?;
            }
            let refunded = rewards::refund_pool(uow, task_id, &task.creator)?;
            uow.remove(&task)?;

            info!(task_id, submissions = submissions.len(), refunded, "Task deleted");
            Ok(())
        })
    }

    pub fn update_submission(
        &self,
        caller: &Address,
        submission_id: SubmissionId,
        update: SubmissionUpdate,
    ) -> DaoResult<Submission> {
        self.ctx.execute("update_submission", |uow, _now| {
            let mut submission = load_submission(uow, submission_id)?;
            if &submission.submitter != caller {
                return Err(DaoError::Unauthorized(format!(
                    "only the submitter can update submission {}",
                    submission_id
                )));
            }
            for (key, value) in update.metadata {
                if value.is_empty() {
                    submission.metadata.remove(&key);
                } else {
                    submission.metadata.insert(key, value);
                }
            }
            uow.save(&submission)?;
            Ok(submission)
        })
    }

    pub fn delete_submission(&self, caller: &Address, submission_id: SubmissionId) -> DaoResult<()> {
        self.ctx.execute("delete_submission", |uow, _now| {
            let submission = load_submission(uow, submission_id)?;
            let task = load_task(uow, submission.task_id)?;
            let allowed = &submission.submitter == caller
                || &task.creator == caller
                || self.ctx.config.is_admin(caller);
            if !allowed {
                return Err(DaoError::Unauthorized(format!(
                    "{} cannot delete submission {}",
                    caller, submission_id
                )));
            }
            remove_submission(uow, &submission)?;
            info!(submission_id, task_id = submission.task_id, "Submission deleted");
            Ok(())
        })
    }

    // ==================== Queries ====================

    pub fn get_task(&self, task_id: TaskId) -> DaoResult<Task> {
        self.ctx
            .repo::<Task>()
            .get(&keys::task(task_id))?
            .ok_or_else(|| DaoError::not_found("Task", task_id))
    }

    pub fn list_tasks(&self) -> DaoResult<Vec<Task>> {
        Ok(self.ctx.repo::<Task>().list()?)
    }

    pub fn tasks_by_creator(&self, creator: &Address) -> DaoResult<Vec<Task>> {
        let prefix = keys::index_prefix(keys::TASKS_BY_CREATOR, creator.as_str());
        Ok(self.ctx.repo::<Task>().list_indexed(&prefix)?)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> DaoResult<Vec<Task>> {
        let prefix = keys::index_prefix(keys::TASKS_BY_STATUS, status.as_str());
        Ok(self.ctx.repo::<Task>().list_indexed(&prefix)?)
    }

    pub fn get_submission(&self, id: SubmissionId) -> DaoResult<Submission> {
        self.ctx
            .repo::<Submission>()
            .get(&keys::submission(id))?
            .ok_or_else(|| DaoError::not_found("Submission", id))
    }

    pub fn list_submissions(&self) -> DaoResult<Vec<Submission>> {
        Ok(self.ctx.repo::<Submission>().list()?)
    }

    pub fn submissions_for_task(&self, task_id: TaskId) -> DaoResult<Vec<Submission>> {
        let prefix = keys::index_prefix(keys::TASK_SUBMISSIONS, &keys::id_segment(task_id));
        Ok(self.ctx.repo::<Submission>().list_indexed(&prefix)?)
    }

    pub fn submissions_by_submitter(&self, submitter: &Address) -> DaoResult<Vec<Submission>> {
        let prefix = keys::index_prefix(keys::SUBMISSIONS_BY_SUBMITTER, submitter.as_str());
        Ok(self.ctx.repo::<Submission>().list_indexed(&prefix)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaoConfig;
    use crate::core::MemberTier;
    use crate::dao::testing::{addr, harness, harness_with, member, task_params as params, START};

    #[test]
    fn test_create_task_escrows_budget() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);

        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();
        assert_eq!(task.id, 1);
        assert_eq!(task.status, TaskStatus::Open);
        assert_eq!(task.escrowed, 110);
        assert_eq!(dao.token().balance_of(&creator).unwrap(), 1_000 - 100 - 110);
        assert_eq!(dao.rewards().pool(1).unwrap().unwrap().balance, 110);
        assert_eq!(
            dao.resolve_content(&task.content_key).unwrap().as_deref(),
            Some("bafy-instructions")
        );
    }

    #[test]
    fn test_create_task_validation() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);

        let mut zero_reward = params(START + 3600);
        zero_reward.reward_per_review = 0;
        let mut past = params(START);
        past.deadline = START - 1;
        let mut restricted = params(START + 3600);
        restricted.visibility = Visibility::Restricted;
        let mut no_title = params(START + 3600);
        no_title.title = "   ".to_string();

        for bad in [zero_reward, past, restricted, no_title] {
            let err = dao.tasks().create_task(&creator, bad).unwrap_err();
            assert!(matches!(err, DaoError::InvalidParameters(_)), "{err}");
        }
        assert!(dao.tasks().list_tasks().unwrap().is_empty());
    }

    #[test]
    fn test_create_task_requires_tier() {
        let mut config = DaoConfig::default();
        config.tasks.min_creator_tier = MemberTier::Advanced;
        let (dao, _clock) = harness_with(config);
        let creator = member(&dao, "creator", 1_000, 100);

        let err = dao.tasks().create_task(&creator, params(START + 3600)).unwrap_err();
        assert!(matches!(err, DaoError::Unauthorized(_)));
        assert!(matches!(
            dao.tasks().create_task(&addr("outsider"), params(START + 3600)),
            Err(DaoError::NotMember(_))
        ));
    }

    #[test]
    fn test_submit_after_deadline_fails() {
        let (dao, clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 60)).unwrap();

        clock.advance(61);
        let err = dao
            .tasks()
            .submit_to_task(&addr("worker"), task.id, "bafy-answer", false)
            .unwrap_err();
        assert!(matches!(err, DaoError::DeadlinePassed { .. }));
    }

    #[test]
    fn test_submit_after_close_fails_regardless_of_deadline() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();

        let closed = dao.tasks().close_task(&creator, task.id).unwrap();
        assert_eq!(closed.status, TaskStatus::Closed);
        assert_eq!(dao.token().balance_of(&creator).unwrap(), 900);

        let err = dao
            .tasks()
            .submit_to_task(&addr("worker"), task.id, "bafy-answer", false)
            .unwrap_err();
        assert!(matches!(err, DaoError::TaskNotOpen(_)));
        assert!(matches!(
            dao.tasks().close_task(&creator, task.id),
            Err(DaoError::TaskNotOpen(_))
        ));
    }

    #[test]
    fn test_anyone_may_close_after_deadline() {
        let (dao, clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 60)).unwrap();

        assert!(matches!(
            dao.tasks().close_task(&addr("passerby"), task.id),
            Err(DaoError::Unauthorized(_))
        ));
        clock.advance(120);
        let closed = dao.tasks().close_task(&addr("passerby"), task.id).unwrap();
        assert!(closed.closed_at.is_some());
    }

    #[test]
    fn test_submission_indexes() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();
        let worker = addr("worker");

        dao.tasks().submit_to_task(&worker, task.id, "bafy-1", false).unwrap();
        dao.tasks().submit_to_task(&worker, task.id, "bafy-2", true).unwrap();

        assert_eq!(dao.tasks().submissions_for_task(task.id).unwrap().len(), 2);
        assert_eq!(dao.tasks().submissions_by_submitter(&worker).unwrap().len(), 2);
        assert_eq!(dao.tasks().get_task(task.id).unwrap().submission_count, 2);
        assert_eq!(dao.tasks().tasks_by_creator(&creator).unwrap().len(), 1);
        assert_eq!(dao.tasks().tasks_by_status(TaskStatus::Open).unwrap().len(), 1);
    }

    #[test]
    fn test_status_index_follows_transitions() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();
        dao.tasks().close_task(&creator, task.id).unwrap();

        assert!(dao.tasks().tasks_by_status(TaskStatus::Open).unwrap().is_empty());
        assert_eq!(dao.tasks().tasks_by_status(TaskStatus::Closed).unwrap().len(), 1);
    }

    #[test]
    fn test_top_up_lets_task_complete_after_rejection() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let mut one = params(START + 3600);
        one.required_submissions = 1;
        let task = dao.tasks().create_task(&creator, one).unwrap();
        assert_eq!(task.escrowed, 55);

        let first = dao.tasks().submit_to_task(&addr("w1"), task.id, "bafy-1", false).unwrap();
        let second = dao.tasks().submit_to_task(&addr("w2"), task.id, "bafy-2", false).unwrap();
        dao.reviews().validate_submission(&creator, first.id, false, None).unwrap();

        let err = dao
            .reviews()
            .validate_submission(&creator, second.id, true, None)
            .unwrap_err();
        assert!(matches!(err, DaoError::PoolExhausted { .. }));

        let funded = dao.tasks().fund_task(&creator, task.id, 5).unwrap();
        assert_eq!(funded.escrowed, 60);
        let outcome = dao.reviews().validate_submission(&creator, second.id, true, None).unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Completed);
        assert_eq!(dao.token().balance_of(&addr("w2")).unwrap(), 50);
    }

    #[test]
    fn test_fund_task_rules() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();

        assert!(matches!(
            dao.tasks().fund_task(&creator, task.id, 0),
            Err(DaoError::InvalidParameters(_))
        ));
        assert!(matches!(
            dao.tasks().fund_task(&addr("other"), task.id, 10),
            Err(DaoError::Unauthorized(_))
        ));
        assert!(matches!(
            dao.tasks().fund_task(&creator, task.id, 10_000),
            Err(DaoError::InsufficientBalance { .. })
        ));

        dao.tasks().close_task(&creator, task.id).unwrap();
        assert!(matches!(
            dao.tasks().fund_task(&creator, task.id, 10),
            Err(DaoError::TaskNotOpen(_))
        ));
    }

    #[test]
    fn test_update_task_rules() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();

        let updated = dao
            .tasks()
            .update_task(
                &creator,
                task.id,
                TaskUpdate {
                    title: Some("Label road signs".into()),
                    nominated_reviewers: Some(vec![addr("reviewer")]),
                    deadline: Some(START + 7200),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Label road signs");
        assert!(updated.nominated_reviewers.contains(&addr("reviewer")));

        let shorten = TaskUpdate {
            deadline: Some(START + 100),
            ..Default::default()
        };
        assert!(dao.tasks().update_task(&creator, task.id, shorten).is_err());
        assert!(matches!(
            dao.tasks().update_task(&addr("other"), task.id, TaskUpdate::default()),
            Err(DaoError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_delete_task_cascades_and_refunds() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();
        let submission = dao
            .tasks()
            .submit_to_task(&addr("worker"), task.id, "bafy-1", false)
            .unwrap();

        dao.tasks().delete_task(&creator, task.id).unwrap();
        assert!(matches!(
            dao.tasks().get_task(task.id),
            Err(DaoError::NotFound { .. })
        ));
        assert!(dao.tasks().get_submission(submission.id).is_err());
        assert!(dao.tasks().submissions_for_task(task.id).unwrap().is_empty());
        assert!(dao.tasks().tasks_by_creator(&creator).unwrap().is_empty());
        assert_eq!(dao.token().balance_of(&creator).unwrap(), 900);
    }

    #[test]
    fn test_update_submission_metadata() {
        let (dao, _clock) = harness();
        let creator = member(&dao, "creator", 1_000, 100);
        let task = dao.tasks().create_task(&creator, params(START + 3600)).unwrap();
        let worker = addr("worker");
        let submission = dao.tasks().submit_to_task(&worker, task.id, "bafy-1", false).unwrap();

        let mut metadata = BTreeMap::new();
        metadata.insert("format".to_string(), "coco".to_string());
        let updated = dao
            .tasks()
            .update_submission(&worker, submission.id, SubmissionUpdate { metadata })
            .unwrap();
        assert_eq!(updated.metadata.get("format").map(String::as_str), Some("coco"));
        assert_eq!(updated.status, SubmissionStatus::Pending);
    }
}
