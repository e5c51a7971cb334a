//! Faucet endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::{ok, parse_address, ApiResult};
use crate::api::ApiState;
use crate::dao::{FaucetClaim, FaucetStatus};

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct FaucetStatusQuery {
    pub address: Option<String>,
}

/// POST /faucet/request
///
/// Answers 429 with a `Retry-After` header once the address used up its window.
pub async fn request_tokens(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<FaucetRequest>,
) -> ApiResult<FaucetClaim> {
    let address = parse_address(&req.address)?;
    ok(state.run(move |dao| dao.faucet().request(&address)).await?)
}

pub async fn status(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<FaucetStatusQuery>,
) -> ApiResult<FaucetStatus> {
    let address = query.address.as_deref().map(parse_address).transpose()?;
    ok(state.run(move |dao| dao.faucet().status(address.as_ref())).await?)
}
