//! Governance endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{caller, ok, ApiResult};
use crate::api::ApiState;
use crate::core::{Proposal, ProposalId, ProposalStatus, VoteSupport};
use crate::dao::{DataDao, ProposalParams};

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub support: VoteSupport,
}

/// Proposal with its status derived at request time.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalView {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub status: ProposalStatus,
}

fn view(dao: &DataDao, proposal: Proposal) -> ProposalView {
    let now = dao.context().now();
    let status = proposal.status_at(now, dao.config().governance.quorum);
    ProposalView { proposal, status }
}

pub async fn list_proposals(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<ProposalView>> {
    let views: Vec<ProposalView> = state
        .run(|dao| {
            let proposals = dao.governance().list()?;
            Ok(proposals.into_iter().map(|p| view(dao, p)).collect())
        })
        .await?;
    ok(views)
}

/// POST /proposals
pub async fn create_proposal(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(params): Json<ProposalParams>,
) -> ApiResult<ProposalView> {
    let proposer = caller(&headers)?;
    ok(state
        .run(move |dao| dao.governance().propose(&proposer, params).map(|p| view(dao, p)))
        .await?)
}

pub async fn get_proposal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<ProposalId>,
) -> ApiResult<ProposalView> {
    ok(state
        .run(move |dao| dao.governance().get(id).map(|p| view(dao, p)))
        .await?)
}

/// POST /proposals/:id/vote
pub async fn cast_vote(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<ProposalId>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<ProposalView> {
    let voter = caller(&headers)?;
    ok(state
        .run(move |dao| dao.governance().cast_vote(&voter, id, req.support).map(|p| view(dao, p)))
        .await?)
}

/// POST /proposals/:id/execute
///
/// Allowed for anyone once voting has ended.
pub async fn execute_proposal(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Path(id): Path<ProposalId>,
) -> ApiResult<ProposalView> {
    let who = caller(&headers)?;
    ok(state
        .run(move |dao| dao.governance().execute_proposal(&who, id).map(|p| view(dao, p)))
        .await?)
}
