//! Transaction buffer over a [`KvStore`]
//!
//! Reads go through the buffer (staged writes win) and remember the
//! versionstamp they observed. Writes are staged together with the index
//! entries derived from the entity, so primary records and indexes land in
//! the same [`AtomicWrite`]. `commit` turns every observed version into a
//! check: if anything read here changed in the meantime the whole unit is
//! rejected.

use super::entity::{Entity, IndexKey, Record};
use super::kv::{AtomicWrite, CommitOutcome, KvStore, Versionstamp};
use super::{keys, StorageError, StorageResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
enum Staged {
    Put(Vec<u8>),
    Delete,
}

pub struct UnitOfWork<'s> {
    store: &'s dyn KvStore,
    observed: BTreeMap<String, Option<Versionstamp>>,
    staged: BTreeMap<String, Staged>,
}

impl<'s> UnitOfWork<'s> {
    pub fn new(store: &'s dyn KvStore) -> Self {
        Self {
            store,
            observed: BTreeMap::new(),
            staged: BTreeMap::new(),
        }
    }

    fn read_raw(&mut self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(match staged {
                Staged::Put(bytes) => Some(bytes.clone()),
                Staged::Delete => None,
            });
        }
        let entry = self.store.get(key)?;
        self.observed
            .entry(key.to_string())
            .or_insert_with(|| entry.as_ref().map(|e| e.version));
        Ok(entry.map(|e| e.value))
    }

    pub fn load<E: Entity>(&mut self, key: &str) -> StorageResult<Option<E>> {
        match self.read_raw(key)? {
            Some(bytes) => Ok(Some(E::decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&mut self, key: &str) -> StorageResult<bool> {
        Ok(self.read_raw(key)?.is_some())
    }

    /// Stage a new entity. Fails when the primary key is already taken.
    pub fn insert<E: Entity>(&mut self, entity: &E) -> StorageResult<()> {
        let key = entity.primary_key();
        if self.read_raw(&key)?.is_some() {
            return Err(StorageError::Duplicate(key));
        }
        self.save(entity)
    }

    /// Stage an insert-or-update, replacing index entries that changed.
    pub fn save<E: Entity>(&mut self, entity: &E) -> StorageResult<()> {
        let key = entity.primary_key();
        let previous = match self.read_raw(&key)? {
            Some(bytes) => E::decode(&key, &bytes)?.index_keys(),
            None => Vec::new(),
        };
        let bytes = entity.encode()?;
        self.apply_index_diff(&previous, &entity.index_keys(), &key)?;
        self.staged.insert(key, Staged::Put(bytes));
        Ok(())
    }

    /// Stage removal of the stored version of `entity` and all its index entries.
    pub fn remove<E: Entity>(&mut self, entity: &E) -> StorageResult<()> {
        let key = entity.primary_key();
        let previous = match self.read_raw(&key)? {
            Some(bytes) => E::decode(&key, &bytes)?.index_keys(),
            None => return Ok(()),
        };
        self.apply_index_diff(&previous, &[], &key)?;
        self.staged.insert(key, Staged::Delete);
        Ok(())
    }

    fn apply_index_diff(
        &mut self,
        previous: &[IndexKey],
        next: &[IndexKey],
        target: &str,
    ) -> StorageResult<()> {
        for old in previous {
            if !next.iter().any(|n| n.key == old.key) {
                self.staged.insert(old.key.clone(), Staged::Delete);
            }
        }
        for new in next {
            if previous.iter().any(|p| p.key == new.key) {
                continue;
            }
            let pointer = Record::Index {
                target: target.to_string(),
            }
            .encode()?;
            self.staged.insert(new.key.clone(), Staged::Put(pointer));
        }
        Ok(())
    }

    /// Take `key` for `target` for good. Fails when it was ever taken before;
    /// claims are never released by removing the target.
    pub fn claim(&mut self, key: &str, target: &str) -> StorageResult<()> {
        if self.read_raw(key)?.is_some() {
            return Err(StorageError::UniqueViolation(key.to_string()));
        }
        let pointer = Record::Index {
            target: target.to_string(),
        }
        .encode()?;
        self.staged.insert(key.to_string(), Staged::Put(pointer));
        Ok(())
    }

    /// Entries under `prefix`, merged with staged writes, in key order.
    pub fn scan_prefix(&mut self, prefix: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for entry in self.store.list_prefix(prefix)? {
            self.observed
                .entry(entry.key.clone())
                .or_insert(Some(entry.version));
            merged.insert(entry.key, entry.value);
        }
        for (key, staged) in self.staged.range::<String, _>(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match staged {
                Staged::Put(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                Staged::Delete => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    /// Primary keys referenced by the index entries under `prefix`.
    pub fn index_targets(&mut self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut targets = Vec::new();
        for (key, bytes) in self.scan_prefix(prefix)? {
            match Record::decode(&key, &bytes)? {
                Record::Index { target } => targets.push(target),
                other => {
                    return Err(StorageError::InvalidData(format!(
                        "{} holds a {}, expected index",
                        key,
                        other.kind()
                    )))
                }
            }
        }
        Ok(targets)
    }

    pub fn load_indexed<E: Entity>(&mut self, prefix: &str) -> StorageResult<Vec<E>> {
        let mut out = Vec::new();
        for target in self.index_targets(prefix)? {
            if let Some(entity) = self.load::<E>(&target)? {
                out.push(entity);
            }
        }
        Ok(out)
    }

    /// Allocate the next id of a named sequence. Ids start at 1.
    pub fn next_id(&mut self, name: &str) -> StorageResult<u64> {
        let key = keys::sequence(name);
        let next = match self.read_raw(&key)? {
            Some(bytes) => match Record::decode(&key, &bytes)? {
                Record::Sequence { next } => next,
                other => {
                    return Err(StorageError::InvalidData(format!(
                        "{} holds a {}, expected sequence",
                        key,
                        other.kind()
                    )))
                }
            },
            None => 1,
        };
        let bumped = Record::Sequence { next: next + 1 }.encode()?;
        self.staged.insert(key, Staged::Put(bumped));
        Ok(next)
    }

    pub fn load_record(&mut self, key: &str) -> StorageResult<Option<Record>> {
        match self.read_raw(key)? {
            Some(bytes) => Ok(Some(Record::decode(key, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_record(&mut self, key: &str, record: &Record) -> StorageResult<()> {
        self.staged.insert(key.to_string(), Staged::Put(record.encode()?));
        Ok(())
    }

    pub fn has_writes(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn commit(self) -> StorageResult<CommitOutcome> {
        if self.staged.is_empty() {
            return Ok(CommitOutcome::Committed(0));
        }
        let mut write = AtomicWrite::new();
        for (key, version) in self.observed {
            write.check(key, version);
        }
        for (key, staged) in self.staged {
            match staged {
                Staged::Put(bytes) => write.set(key, bytes),
                Staged::Delete => write.delete(key),
            };
        }
        self.store.commit(write)
    }
}
