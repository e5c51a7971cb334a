//! Shared state used across all API endpoints.

use axum::http::StatusCode;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::dao::DataDao;
use crate::error::DaoResult;

pub struct ApiState {
    pub dao: Arc<DataDao>,
}

impl ApiState {
    pub fn new(dao: Arc<DataDao>) -> Self {
        Self { dao }
    }

    /// Run a DAO call on the blocking pool. Every call holds the store lock
    /// and does synchronous SQLite I/O.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&DataDao) -> DaoResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let dao = self.dao.clone();
        tokio::task::spawn_blocking(move || f(&dao))
            .await
            .map_err(|e| {
                tracing::error!("DAO worker failed: {}", e);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal worker failure")
            })?
            .map_err(ApiError::from)
    }
}
