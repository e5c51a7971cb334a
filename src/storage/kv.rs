//! Key-value store abstraction
//!
//! Every entry carries the versionstamp of the commit that last wrote it.
//! An [`AtomicWrite`] bundles version checks with mutations; the backend
//! applies all of them or none.

use super::StorageResult;

pub type Versionstamp = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub version: Versionstamp,
}

/// Expected state of a key at commit time. `None` means the key must be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCheck {
    pub key: String,
    pub version: Option<Versionstamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl Mutation {
    pub fn key(&self) -> &str {
        match self {
            Mutation::Set { key, .. } | Mutation::Delete { key } => key,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AtomicWrite {
    pub checks: Vec<KeyCheck>,
    pub mutations: Vec<Mutation>,
}

impl AtomicWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, key: impl Into<String>, version: Option<Versionstamp>) -> &mut Self {
        self.checks.push(KeyCheck {
            key: key.into(),
            version,
        });
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: Vec<u8>) -> &mut Self {
        self.mutations.push(Mutation::Set {
            key: key.into(),
            value,
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.mutations.push(Mutation::Delete { key: key.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All checks held and the mutations were applied at this versionstamp.
    Committed(Versionstamp),
    /// A check failed; nothing was written.
    CheckFailed,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }
}

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<KvEntry>>;

    /// Entries whose key starts with `prefix`, in key order.
    fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<KvEntry>>;

    fn commit(&self, write: AtomicWrite) -> StorageResult<CommitOutcome>;
}
