//! Task endpoints.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{caller, ok, parse_address, ApiResult};
use crate::api::ApiState;
use crate::core::{Amount, Task, TaskId, TaskStatus};
use crate::dao::{CreateTaskParams, TaskUpdate};

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub amount: Amount,
}

/// GET /tasks
///
/// Optional `?status=open|completed|closed` filter.
pub async fn list_tasks(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Vec<Task>> {
    let tasks = state
        .run(move |dao| match query.status {
            Some(status) => dao.tasks().tasks_by_status(status),
            None => dao.tasks().list_tasks(),
        })
        .await?;
    ok(tasks)
}

/// POST /tasks
pub async fn create_task(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(params): Json<CreateTaskParams>,
) -> ApiResult<Task> {
    let creator = caller(&headers)?;
    ok(state.run(move |dao| dao.tasks().create_task(&creator, params)).await?)
}

pub async fn get_task(State(state): State<Arc<ApiState>>, Path(id): Path<TaskId>) -> ApiResult<Task> {
    ok(state.run(move |dao| dao.tasks().get_task(id)).await?)
}

/// PUT /tasks/:id
pub async fn update_task(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<Task> {
    let who = caller(&headers)?;
    ok(state.run(move |dao| dao.tasks().update_task(&who, id, update)).await?)
}

/// DELETE /tasks/:id
pub async fn delete_task(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> ApiResult<TaskId> {
    let who = caller(&headers)?;
    state.run(move |dao| dao.tasks().delete_task(&who, id)).await?;
    ok(id)
}

pub async fn tasks_by_creator(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Vec<Task>> {
    let creator = parse_address(&address)?;
    ok(state.run(move |dao| dao.tasks().tasks_by_creator(&creator)).await?)
}

/// POST /tasks/:id/fund
///
/// Creator tops up the reward pool of an open task.
pub async fn fund_task(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
    Json(req): Json<FundRequest>,
) -> ApiResult<Task> {
    let who = caller(&headers)?;
    ok(state.run(move |dao| dao.tasks().fund_task(&who, id, req.amount)).await?)
}

/// POST /tasks/:id/close
///
/// Creator or admin at any time; anyone once the deadline has passed.
pub async fn close_task(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> ApiResult<Task> {
    let who = caller(&headers)?;
    ok(state.run(move |dao| dao.tasks().close_task(&who, id)).await?)
}
