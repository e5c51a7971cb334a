//! DataDAO: a data labeling marketplace run by its members
//!
//! Creators escrow token rewards on data tasks, contributors submit content
//! references, reviewers approve or reject them, and stake-weighted
//! governance steers the rest.
//!
//! ## Module Structure
//!
//! - `core/`: Addresses, packed content identifiers and domain records
//! - `storage/`: Key-value store, entities, secondary indexes, unit of work
//! - `dao/`: Membership, token ledger, tasks, reviews, datasets, governance, faucet
//! - `api/`: REST API
//! - `client`: HTTP client for the REST API
//! - `config`: DAO configuration
//! - `util/`: Clock and formatting helpers

// ============================================================================
// MODULES
// ============================================================================

/// Shared utility functions
pub mod util;

/// Core types
pub mod core;

/// Error types
pub mod error;

/// Data persistence layer
pub mod storage;

/// DAO configuration
pub mod config;

/// DAO components
pub mod dao;

/// REST API
pub mod api;

/// HTTP client
pub mod client;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use crate::config::DaoConfig;
pub use crate::core::{Address, Bytes32};
pub use client::DaoClient;
pub use dao::{DaoContext, DataDao};
pub use error::{DaoError, DaoResult, ErrorKind};
pub use storage::{KvStore, SqliteKv};

/// Version string reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
