//! Dataset registry endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{caller, ok, parse_address, ApiResult};
use crate::api::ApiState;
use crate::core::{Address, Dataset, DatasetId};
use crate::dao::CreateDatasetParams;

#[derive(Debug, Deserialize)]
pub struct AccessRequest {
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseRequest {
    /// Seconds of access bought, required for subscriptions
    #[serde(default)]
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessResponse {
    pub dataset_id: DatasetId,
    pub address: Address,
    pub has_access: bool,
}

pub async fn list_datasets(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<Dataset>> {
    ok(state.run(|dao| dao.datasets().list()).await?)
}

/// POST /datasets
pub async fn create_dataset(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(params): Json<CreateDatasetParams>,
) -> ApiResult<Dataset> {
    let owner = caller(&headers)?;
    ok(state.run(move |dao| dao.datasets().create_dataset(&owner, params)).await?)
}

pub async fn get_dataset(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<DatasetId>,
) -> ApiResult<Dataset> {
    ok(state.run(move |dao| dao.datasets().get(id)).await?)
}

pub async fn datasets_by_owner(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<Vec<Dataset>> {
    let owner = parse_address(&address)?;
    ok(state.run(move |dao| dao.datasets().by_owner(&owner)).await?)
}

pub async fn datasets_by_category(
    State(state): State<Arc<ApiState>>,
    Path(category): Path<String>,
) -> ApiResult<Vec<Dataset>> {
    ok(state.run(move |dao| dao.datasets().by_category(&category)).await?)
}

pub async fn validate_dataset(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<DatasetId>,
) -> ApiResult<Dataset> {
    let who = caller(&headers)?;
    ok(state.run(move |dao| dao.datasets().validate_dataset(&who, id)).await?)
}

/// POST /datasets/:id/purchase
///
/// Charges the caller the dataset price and adds them to the allow list.
/// Subscriptions take `{"duration_secs": n}` and expire after that long.
pub async fn purchase_access(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<DatasetId>,
    body: Option<Json<PurchaseRequest>>,
) -> ApiResult<Dataset> {
    let buyer = caller(&headers)?;
    let duration = body.and_then(|Json(req)| req.duration_secs);
    ok(state
        .run(move |dao| dao.datasets().purchase_access(&buyer, id, duration))
        .await?)
}

pub async fn grant_access(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<DatasetId>,
    Json(req): Json<AccessRequest>,
) -> ApiResult<Dataset> {
    let who = caller(&headers)?;
    let user = parse_address(&req.address)?;
    ok(state.run(move |dao| dao.datasets().grant_access(&who, id, &user)).await?)
}

pub async fn revoke_access(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<DatasetId>,
    Json(req): Json<AccessRequest>,
) -> ApiResult<Dataset> {
    let who = caller(&headers)?;
    let user = parse_address(&req.address)?;
    ok(state.run(move |dao| dao.datasets().revoke_access(&who, id, &user)).await?)
}

pub async fn record_usage(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<DatasetId>,
) -> ApiResult<Dataset> {
    let user = caller(&headers)?;
    ok(state.run(move |dao| dao.datasets().record_usage(&user, id)).await?)
}

pub async fn check_access(
    State(state): State<Arc<ApiState>>,
    Path((id, address)): Path<(DatasetId, String)>,
) -> ApiResult<AccessResponse> {
    let address = parse_address(&address)?;
    let response = state
        .run(move |dao| {
            let has_access = dao.datasets().has_access(id, &address)?;
            Ok(AccessResponse {
                dataset_id: id,
                address,
                has_access,
            })
        })
        .await?;
    ok(response)
}
