//! HTTP client for the DataDAO REST API.
//!
//! Unwraps the `{success, data | message}` envelope; a `success: false`
//! answer becomes an error carrying the server message.

use anyhow::{anyhow, Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::api::response::{ApiResponse, ACTOR_HEADER};
use crate::api::routes::governance::ProposalView;
use crate::api::routes::system::{BalanceResponse, HealthResponse};
use crate::core::{
    Actor, Address, Amount, DaoStats, ProposalId, Submission, SubmissionId, Task, TaskId,
    TaskStatus, VoteSupport,
};
use crate::dao::{CreateTaskParams, FaucetClaim, FaucetStatus, ProposalParams, ReviewOutcome};

pub struct DaoClient {
    base_url: String,
    client: reqwest::Client,
    actor: Option<Address>,
}

impl DaoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            actor: None,
        }
    }

    /// Act as `actor` on mutating calls.
    pub fn with_actor(mut self, actor: Address) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn actor(&self) -> Result<&Address> {
        self.actor
            .as_ref()
            .ok_or_else(|| anyhow!("No actor address configured for this call"))
    }

    fn signed(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(builder.header(ACTOR_HEADER, self.actor()?.as_str()))
    }

    async fn send<T: DeserializeOwned>(&self, what: &str, builder: RequestBuilder) -> Result<T> {
        let resp = builder
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!("{} -> {} ({} bytes)", what, status, body.len());

        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(anyhow!("Failed to {}: {}", what, status));
            }
            Err(e) => return Err(anyhow!("Failed to parse response to {}: {}", what, e)),
        };

        if !envelope.success || status != StatusCode::OK {
            let message = envelope.message.unwrap_or_else(|| status.to_string());
            return Err(anyhow!("Failed to {} ({}): {}", what, status.as_u16(), message));
        }
        envelope
            .data
            .ok_or_else(|| anyhow!("Failed to {}: empty response", what))
    }

    // ==================== System ====================

    pub async fn health(&self) -> Result<HealthResponse> {
        self.send("check health", self.client.get(self.url("/health")))
            .await
    }

    pub async fn stats(&self) -> Result<DaoStats> {
        self.send("get stats", self.client.get(self.url("/stats"))).await
    }

    pub async fn balance(&self, address: &Address) -> Result<BalanceResponse> {
        self.send(
            "get balance",
            self.client.get(self.url(&format!("/balances/{}", address))),
        )
        .await
    }

    pub async fn transfer(&self, to: &Address, amount: Amount) -> Result<BalanceResponse> {
        let req = self
            .client
            .post(self.url("/balances/transfer"))
            .json(&json!({ "to": to, "amount": amount }));
        self.send("transfer tokens", self.signed(req)?).await
    }

    // ==================== Faucet ====================

    pub async fn request_faucet(&self, address: &Address) -> Result<FaucetClaim> {
        let req = self
            .client
            .post(self.url("/faucet/request"))
            .json(&json!({ "address": address }));
        self.send("request faucet tokens", req).await
    }

    pub async fn faucet_status(&self, address: Option<&Address>) -> Result<FaucetStatus> {
        let path = match address {
            Some(a) => format!("/faucet/status?address={}", a),
            None => "/faucet/status".to_string(),
        };
        self.send("get faucet status", self.client.get(self.url(&path)))
            .await
    }

    // ==================== Membership ====================

    pub async fn join(&self, stake: Amount, display_name: Option<&str>) -> Result<Actor> {
        let req = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "stake": stake, "display_name": display_name }));
        self.send("join the DAO", self.signed(req)?).await
    }

    pub async fn stake(&self, amount: Amount) -> Result<Actor> {
        let path = format!("/users/{}/stake", self.actor()?);
        let req = self
            .client
            .post(self.url(&path))
            .json(&json!({ "amount": amount }));
        self.send("stake tokens", self.signed(req)?).await
    }

    pub async fn get_user(&self, address: &Address) -> Result<Actor> {
        self.send(
            "get user",
            self.client.get(self.url(&format!("/users/{}", address))),
        )
        .await
    }

    // ==================== Tasks ====================

    pub async fn create_task(&self, params: &CreateTaskParams) -> Result<Task> {
        let req = self.client.post(self.url("/tasks")).json(params);
        self.send("create task", self.signed(req)?).await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task> {
        self.send(
            "get task",
            self.client.get(self.url(&format!("/tasks/{}", id))),
        )
        .await
    }

    pub async fn list_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let path = match status {
            Some(s) => format!("/tasks?status={}", s),
            None => "/tasks".to_string(),
        };
        self.send("list tasks", self.client.get(self.url(&path))).await
    }

    pub async fn fund_task(&self, id: TaskId, amount: Amount) -> Result<Task> {
        let req = self
            .client
            .post(self.url(&format!("/tasks/{}/fund", id)))
            .json(&json!({ "amount": amount }));
        self.send("fund task", self.signed(req)?).await
    }

    pub async fn close_task(&self, id: TaskId) -> Result<Task> {
        let req = self.client.post(self.url(&format!("/tasks/{}/close", id)));
        self.send("close task", self.signed(req)?).await
    }

    // ==================== Submissions and reviews ====================

    pub async fn submit(
        &self,
        task_id: TaskId,
        content_reference: &str,
        is_encrypted: bool,
    ) -> Result<Submission> {
        let req = self.client.post(self.url("/submissions")).json(&json!({
            "task_id": task_id,
            "content_reference": content_reference,
            "is_encrypted": is_encrypted,
        }));
        self.send("submit to task", self.signed(req)?).await
    }

    pub async fn submissions_for_task(&self, task_id: TaskId) -> Result<Vec<Submission>> {
        self.send(
            "list submissions",
            self.client
                .get(self.url(&format!("/submissions/task/{}", task_id))),
        )
        .await
    }

    pub async fn review(
        &self,
        submission_id: SubmissionId,
        approved: bool,
        feedback: Option<&str>,
    ) -> Result<ReviewOutcome> {
        let req = self.client.post(self.url("/reviews")).json(&json!({
            "submission_id": submission_id,
            "approved": approved,
            "feedback": feedback,
        }));
        self.send("review submission", self.signed(req)?).await
    }

    // ==================== Governance ====================

    pub async fn create_proposal(&self, params: &ProposalParams) -> Result<ProposalView> {
        let req = self.client.post(self.url("/proposals")).json(params);
        self.send("create proposal", self.signed(req)?).await
    }

    pub async fn get_proposal(&self, id: ProposalId) -> Result<ProposalView> {
        self.send(
            "get proposal",
            self.client.get(self.url(&format!("/proposals/{}", id))),
        )
        .await
    }

    pub async fn vote(&self, id: ProposalId, support: VoteSupport) -> Result<ProposalView> {
        let req = self
            .client
            .post(self.url(&format!("/proposals/{}/vote", id)))
            .json(&json!({ "support": support }));
        self.send("cast vote", self.signed(req)?).await
    }

    pub async fn execute_proposal(&self, id: ProposalId) -> Result<ProposalView> {
        let req = self
            .client
            .post(self.url(&format!("/proposals/{}/execute", id)));
        self.send("execute proposal", self.signed(req)?).await
    }
}
