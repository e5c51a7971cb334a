//! Read-only access to one entity kind.

use super::entity::{Entity, Record};
use super::kv::KvStore;
use super::{StorageError, StorageResult};
use std::marker::PhantomData;

pub struct Repository<'s, E> {
    store: &'s dyn KvStore,
    _entity: PhantomData<E>,
}

impl<'s, E: Entity> Repository<'s, E> {
    pub fn new(store: &'s dyn KvStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn get(&self, key: &str) -> StorageResult<Option<E>> {
        match self.store.get(key)? {
            Some(entry) => Ok(Some(E::decode(&entry.key, &entry.value)?)),
            None => Ok(None),
        }
    }

    /// Every primary record of this kind, in key order.
    pub fn list(&self) -> StorageResult<Vec<E>> {
        self.store
            .list_prefix(E::PREFIX)?
            .into_iter()
            .map(|entry| E::decode(&entry.key, &entry.value))
            .collect()
    }

    pub fn count(&self) -> StorageResult<usize> {
        Ok(self.store.list_prefix(E::PREFIX)?.len())
    }

    /// Records referenced by the index entries under `prefix`.
    pub fn list_indexed(&self, prefix: &str) -> StorageResult<Vec<E>> {
        let mut out = Vec::new();
        for entry in self.store.list_prefix(prefix)? {
            let target = match Record::decode(&entry.key, &entry.value)? {
                Record::Index { target } => target,
                other => {
                    return Err(StorageError::InvalidData(format!(
                        "{} holds a {}, expected index",
                        entry.key,
                        other.kind()
                    )))
                }
            };
            if let Some(entity) = self.get(&target)? {
                out.push(entity);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, Balance};
    use crate::storage::{keys, SqliteKv, UnitOfWork};

    #[test]
    fn test_list_and_count() {
        let kv = SqliteKv::open_in_memory().unwrap();
        let mut uow = UnitOfWork::new(&kv);
        for name in ["a", "b", "c"] {
            uow.save(&Balance {
                address: Address::system(name),
                amount: 10,
            })
            .unwrap();
        }
        uow.commit().unwrap();

        let repo: Repository<Balance> = Repository::new(&kv);
        assert_eq!(repo.count().unwrap(), 3);
        assert_eq!(repo.list().unwrap().len(), 3);

        let b = repo.get(&keys::balance(&Address::system("b"))).unwrap().unwrap();
        assert_eq!(b.amount, 10);
    }
}
