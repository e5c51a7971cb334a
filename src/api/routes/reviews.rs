//! Review endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{caller, ok, parse_address, ApiResult};
use crate::api::ApiState;
use crate::core::{Review, ReviewId, SubmissionId};
use crate::dao::ReviewOutcome;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub submission_id: SubmissionId,
    pub approved: bool,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

pub async fn list_reviews(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<Review>> {
    ok(state.run(|dao| dao.reviews().list_reviews()).await?)
}

/// POST /reviews
///
/// Records the verdict and settles consensus, rewards and task completion.
pub async fn create_review(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<ReviewOutcome> {
    let reviewer = caller(&headers)?;
    ok(state
        .run(move |dao| {
            dao.reviews()
                .validate_submission(&reviewer, req.submission_id, req.approved, req.feedback)
        })
        .await?)
}

pub async fn get_review(State(state): State<Arc<ApiState>>, Path(id): Path<ReviewId>) -> ApiResult<Review> {
    ok(state.run(move |dao| dao.reviews().get_review(id)).await?)
}

pub async fn update_review(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<ReviewId>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<Review> {
    let who = caller(&headers)?;
    ok(state.run(move |dao| dao.reviews().update_review(&who, id, req.feedback)).await?)
}

pub async fn delete_review(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<ReviewId>,
) -> ApiResult<ReviewId> {
    let who = caller(&headers)?;
    state.run(move |dao| dao.reviews().delete_review(&who, id)).await?;
    ok(id)
}

pub async fn reviews_for_submission(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<SubmissionId>,
) -> ApiResult<Vec<Review>> {
    ok(state.run(move |dao| dao.reviews().reviews_for_submission(id)).await?)
}

pub async fn reviews_by_reviewer(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Vec<Review>> {
    let reviewer = parse_address(&address)?;
    ok(state.run(move |dao| dao.reviews().reviews_by_reviewer(&reviewer)).await?)
}
