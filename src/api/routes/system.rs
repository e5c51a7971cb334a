//! Health, stats, balances and content lookup.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{caller, ok, parse_address, ApiError, ApiResult};
use crate::api::ApiState;
use crate::core::{Address, Amount, Bytes32, DaoStats};
use crate::dao::DataDao;
use crate::error::{DaoError, DaoResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: Address,
    pub balance: Amount,
    pub staked: Amount,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub to: String,
    pub amount: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentResponse {
    pub packed: Bytes32,
    pub cid: String,
    /// False when the identifier was decoded from the packed bytes alone
    pub recorded: bool,
}

fn balance_response(dao: &DataDao, address: Address, balance: Amount) -> DaoResult<BalanceResponse> {
    let staked = dao
        .membership()
        .find(&address)?
        .map(|a| a.staked_amount)
        .unwrap_or(0);
    Ok(BalanceResponse {
        address,
        balance,
        staked,
    })
}

pub async fn health() -> ApiResult<HealthResponse> {
    ok(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

pub async fn stats(State(state): State<Arc<ApiState>>) -> ApiResult<DaoStats> {
    ok(state.run(|dao| dao.stats()).await?)
}

pub async fn balance(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<BalanceResponse> {
    let address = parse_address(&address)?;
    ok(state
        .run(move |dao| {
            let balance = dao.token().balance_of(&address)?;
            balance_response(dao, address, balance)
        })
        .await?)
}

/// POST /balances/transfer
pub async fn transfer(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(req): Json<TransferRequest>,
) -> ApiResult<BalanceResponse> {
    let from = caller(&headers)?;
    let to = parse_address(&req.to)?;
    ok(state
        .run(move |dao| {
            let balance = dao.token().transfer(&from, &to, req.amount)?;
            balance_response(dao, from, balance)
        })
        .await?)
}

/// GET /content/:packed
///
/// Resolves a packed 32-byte key to its content identifier. Keys that were
/// never recorded are decoded from the bytes when they hold UTF-8 text.
pub async fn resolve_content(
    State(state): State<Arc<ApiState>>,
    Path(packed): Path<String>,
) -> ApiResult<ContentResponse> {
    let key = Bytes32::from_hex(&packed)?;
    if let Some(cid) = state.run(move |dao| dao.resolve_content(&key)).await? {
        return ok(ContentResponse {
            packed: key,
            cid,
            recorded: true,
        });
    }
    if key.is_zero() {
        return Err(ApiError::from(DaoError::not_found("Content", packed)));
    }
    let cid = key.to_utf8_cid()?;
    ok(ContentResponse {
        packed: key,
        cid,
        recorded: false,
    })
}
