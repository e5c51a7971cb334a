//! REST API implementation.

pub mod response;
pub mod routes;
pub mod state;

pub use response::{ApiError, ApiResponse, ApiResult, ACTOR_HEADER};
pub use state::ApiState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use routes::{datasets, faucet, governance, reviews, submissions, system, tasks, users};

/// Request bodies carry references and metadata, never content itself.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/stats", get(system::stats))
        .route("/balances/transfer", post(system::transfer))
        .route("/balances/:address", get(system::balance))
        .route("/content/:packed", get(system::resolve_content))
        // Tasks
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/creator/:address", get(tasks::tasks_by_creator))
        .route("/tasks/:id/fund", post(tasks::fund_task))
        .route("/tasks/:id/close", post(tasks::close_task))
        // Submissions
        .route(
            "/submissions",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route(
            "/submissions/:id",
            get(submissions::get_submission)
                .put(submissions::update_submission)
                .delete(submissions::delete_submission),
        )
        .route("/submissions/task/:task_id", get(submissions::submissions_for_task))
        .route(
            "/submissions/submitter/:address",
            get(submissions::submissions_by_submitter),
        )
        .route("/submissions/:id/approve", post(submissions::approve_submission))
        .route("/submissions/:id/reject", post(submissions::reject_submission))
        // Reviews
        .route("/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route(
            "/reviews/:id",
            get(reviews::get_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route("/reviews/submission/:id", get(reviews::reviews_for_submission))
        .route("/reviews/reviewer/:address", get(reviews::reviews_by_reviewer))
        // Users
        .route("/users", get(users::list_users).post(users::join))
        .route("/users/:address", get(users::get_user).delete(users::deactivate))
        .route("/users/:address/verify", post(users::verify))
        .route("/users/:address/stake", post(users::stake))
        // Faucet
        .route("/faucet/request", post(faucet::request_tokens))
        .route("/faucet/status", get(faucet::status))
        // Datasets
        .route("/datasets", get(datasets::list_datasets).post(datasets::create_dataset))
        .route("/datasets/:id", get(datasets::get_dataset))
        .route("/datasets/owner/:address", get(datasets::datasets_by_owner))
        .route("/datasets/category/:category", get(datasets::datasets_by_category))
        .route("/datasets/:id/validate", post(datasets::validate_dataset))
        .route("/datasets/:id/purchase", post(datasets::purchase_access))
        .route("/datasets/:id/grant", post(datasets::grant_access))
        .route("/datasets/:id/revoke", post(datasets::revoke_access))
        .route("/datasets/:id/usage", post(datasets::record_usage))
        .route("/datasets/:id/access/:address", get(datasets::check_access))
        // Governance
        .route(
            "/proposals",
            get(governance::list_proposals).post(governance::create_proposal),
        )
        .route("/proposals/:id", get(governance::get_proposal))
        .route("/proposals/:id/vote", post(governance::cast_vote))
        .route("/proposals/:id/execute", post(governance::execute_proposal))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ============================================================================
// SERVER STARTUP
// ============================================================================

pub async fn run_server(state: Arc<ApiState>, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║                       DataDAO API                            ║");
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Version:      {:44} ║", crate::VERSION);
    info!("║  Listening on: {:44} ║", addr);
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Endpoints:                                                  ║");
    info!("║    /tasks /submissions /reviews /users /datasets             ║");
    info!("║    /proposals /faucet /balances /content /stats /health      ║");
    info!("╚══════════════════════════════════════════════════════════════╝");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
