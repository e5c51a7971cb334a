//! Versioned key-value storage with derived secondary indexes.
//!
//! - `kv`: the `KvStore` trait, versionstamps and atomic writes
//! - `sqlite`: SQLite backend
//! - `entity`: tagged records and the `Entity` trait
//! - `keys`: key layout for primary records and index namespaces
//! - `unit_of_work`: read-your-writes transaction buffer
//! - `repository`: read side per entity

pub mod entity;
pub mod keys;
pub mod kv;
pub mod repository;
pub mod sqlite;
pub mod unit_of_work;

pub use entity::{Entity, IndexKey, Record};
pub use kv::{AtomicWrite, CommitOutcome, KeyCheck, KvEntry, KvStore, Mutation, Versionstamp};
pub use repository::Repository;
pub use sqlite::SqliteKv;
pub use unit_of_work::UnitOfWork;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("unique index violated: {0}")]
    UniqueViolation(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
