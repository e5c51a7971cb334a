//! Submission endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{caller, ok, parse_address, ApiResult};
use crate::api::ApiState;
use crate::core::{Submission, SubmissionId, TaskId};
use crate::dao::{ReviewOutcome, SubmissionUpdate};

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub task_id: TaskId,
    pub content_reference: String,
    #[serde(default)]
    pub is_encrypted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerdictRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

pub async fn list_submissions(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<Submission>> {
    ok(state.run(|dao| dao.tasks().list_submissions()).await?)
}

/// POST /submissions
pub async fn create_submission(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(req): Json<CreateSubmissionRequest>,
) -> ApiResult<Submission> {
    let submitter = caller(&headers)?;
    ok(state
        .run(move |dao| {
            dao.tasks()
                .submit_to_task(&submitter, req.task_id, &req.content_reference, req.is_encrypted)
        })
        .await?)
}

pub async fn get_submission(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<SubmissionId>,
) -> ApiResult<Submission> {
    ok(state.run(move |dao| dao.tasks().get_submission(id)).await?)
}

/// PUT /submissions/:id
///
/// Merges metadata entries; an empty value removes the key.
pub async fn update_submission(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<SubmissionId>,
    Json(update): Json<SubmissionUpdate>,
) -> ApiResult<Submission> {
    let who = caller(&headers)?;
    ok(state.run(move |dao| dao.tasks().update_submission(&who, id, update)).await?)
}

pub async fn delete_submission(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<SubmissionId>,
) -> ApiResult<SubmissionId> {
    let who = caller(&headers)?;
    state.run(move |dao| dao.tasks().delete_submission(&who, id)).await?;
    ok(id)
}

pub async fn submissions_for_task(
    State(state): State<Arc<ApiState>>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<Vec<Submission>> {
    ok(state.run(move |dao| dao.tasks().submissions_for_task(task_id)).await?)
}

pub async fn submissions_by_submitter(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Vec<Submission>> {
    let submitter = parse_address(&address)?;
    ok(state.run(move |dao| dao.tasks().submissions_by_submitter(&submitter)).await?)
}

/// POST /submissions/:id/approve
pub async fn approve_submission(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<SubmissionId>,
    body: Option<Json<VerdictRequest>>,
) -> ApiResult<ReviewOutcome> {
    verdict(&state, &headers, id, true, body).await
}

/// POST /submissions/:id/reject
pub async fn reject_submission(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<SubmissionId>,
    body: Option<Json<VerdictRequest>>,
) -> ApiResult<ReviewOutcome> {
    verdict(&state, &headers, id, false, body).await
}

async fn verdict(
    state: &ApiState,
    headers: &HeaderMap,
    id: SubmissionId,
    approved: bool,
    body: Option<Json<VerdictRequest>>,
) -> ApiResult<ReviewOutcome> {
    let reviewer = caller(headers)?;
    let feedback = body.and_then(|Json(req)| req.feedback);
    ok(state
        .run(move |dao| dao.reviews().validate_submission(&reviewer, id, approved, feedback))
        .await?)
}
