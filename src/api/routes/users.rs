//! Membership endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{caller, ok, parse_address, ApiError, ApiResult};
use crate::api::ApiState;
use crate::core::{Actor, Amount};
use crate::error::DaoError;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub stake: Amount,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub amount: Amount,
}

pub async fn list_users(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<Actor>> {
    ok(state.run(|dao| dao.membership().list()).await?)
}

/// POST /users
///
/// Join the DAO by staking from the caller's balance.
pub async fn join(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(req): Json<JoinRequest>,
) -> ApiResult<Actor> {
    let who = caller(&headers)?;
    ok(state
        .run(move |dao| dao.membership().join_dao(&who, req.stake, req.display_name))
        .await?)
}

pub async fn get_user(State(state): State<Arc<ApiState>>, Path(address): Path<String>) -> ApiResult<Actor> {
    let address = parse_address(&address)?;
    ok(state.run(move |dao| dao.membership().get(&address)).await?)
}

/// DELETE /users/:address
///
/// Deactivates the member and returns the stake. Self or admin.
pub async fn deactivate(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(address): Path<String>,
) -> ApiResult<Actor> {
    let who = caller(&headers)?;
    let address = parse_address(&address)?;
    ok(state.run(move |dao| dao.membership().deactivate(&who, &address)).await?)
}

/// POST /users/:address/verify (admin only)
pub async fn verify(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(address): Path<String>,
) -> ApiResult<Actor> {
    let who = caller(&headers)?;
    let address = parse_address(&address)?;
    ok(state.run(move |dao| dao.membership().verify(&who, &address)).await?)
}

/// POST /users/:address/stake
pub async fn stake(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(address): Path<String>,
    Json(req): Json<StakeRequest>,
) -> ApiResult<Actor> {
    let who = caller(&headers)?;
    let address = parse_address(&address)?;
    if who != address {
        return Err(ApiError::from(DaoError::Unauthorized(format!(
            "{} cannot stake for {}",
            who, address
        ))));
    }
    ok(state.run(move |dao| dao.membership().stake_more(&address, req.amount)).await?)
}
