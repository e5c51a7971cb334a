//! SQLite-backed key-value store
//!
//! One `kv` table holds every record and index entry. A single counter in
//! `kv_meta` hands out versionstamps; each successful commit bumps it once.

use super::kv::{AtomicWrite, CommitOutcome, KvEntry, KvStore, Mutation, Versionstamp};
use super::StorageResult;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS kv_meta (
    name TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);

INSERT OR IGNORE INTO kv_meta (name, value) VALUES ('versionstamp', 0);
"#;

pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened KV store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Versionstamp of the most recent commit.
    pub fn current_version(&self) -> StorageResult<Versionstamp> {
        let conn = self.conn.lock();
        let v: i64 = conn.query_row(
            "SELECT value FROM kv_meta WHERE name = 'versionstamp'",
            [],
            |row| row.get(0),
        )?;
        Ok(v as Versionstamp)
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> StorageResult<Option<KvEntry>> {
        let conn = self.conn.lock();
        let entry = conn
            .query_row(
                "SELECT key, value, version FROM kv WHERE key = ?1",
                params![key],
                |row| {
                    Ok(KvEntry {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        version: row.get::<_, i64>(2)? as Versionstamp,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<KvEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT key, value, version FROM kv
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key",
        )?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok(KvEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                version: row.get::<_, i64>(2)? as Versionstamp,
            })
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn commit(&self, write: AtomicWrite) -> StorageResult<CommitOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for check in &write.checks {
            let current: Option<i64> = tx
                .query_row(
                    "SELECT version FROM kv WHERE key = ?1",
                    params![check.key],
                    |row| row.get(0),
                )
                .optional()?;
            let current = current.map(|v| v as Versionstamp);
            if current != check.version {
                debug!(
                    key = %check.key,
                    expected = ?check.version,
                    actual = ?current,
                    "KV check failed, rolling back"
                );
                return Ok(CommitOutcome::CheckFailed);
            }
        }

        let last: i64 = tx.query_row(
            "SELECT value FROM kv_meta WHERE name = 'versionstamp'",
            [],
            |row| row.get(0),
        )?;
        if write.mutations.is_empty() {
            return Ok(CommitOutcome::Committed(last as Versionstamp));
        }

        let version = last + 1;
        for mutation in &write.mutations {
            match mutation {
                Mutation::Set { key, value } => {
                    tx.execute(
                        "INSERT INTO kv (key, value, version) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value, version = excluded.version",
                        params![key, value, version],
                    )?;
                }
                Mutation::Delete { key } => {
                    tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                }
            }
        }
        tx.execute(
            "UPDATE kv_meta SET value = ?1 WHERE name = 'versionstamp'",
            params![version],
        )?;
        tx.commit()?;

        Ok(CommitOutcome::Committed(version as Versionstamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn put(kv: &SqliteKv, key: &str, value: &[u8]) -> CommitOutcome {
        let mut write = AtomicWrite::new();
        write.set(key, value.to_vec());
        kv.commit(write).unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert!(put(&kv, "a", b"1").is_committed());

        let entry = kv.get("a").unwrap().unwrap();
        assert_eq!(entry.value, b"1");
        assert_eq!(entry.version, 1);
        assert!(kv.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_versionstamp_increases_per_commit() {
        let kv = SqliteKv::open_in_memory().unwrap();
        put(&kv, "a", b"1");
        put(&kv, "b", b"2");
        put(&kv, "a", b"3");

        assert_eq!(kv.get("a").unwrap().unwrap().version, 3);
        assert_eq!(kv.get("b").unwrap().unwrap().version, 2);
        assert_eq!(kv.current_version().unwrap(), 3);
    }

    #[test]
    fn test_stale_check_rejects_whole_write() {
        let kv = SqliteKv::open_in_memory().unwrap();
        put(&kv, "a", b"1");
        let seen = kv.get("a").unwrap().unwrap().version;
        put(&kv, "a", b"2");

        let mut write = AtomicWrite::new();
        write.check("a", Some(seen)).set("a", b"lost".to_vec()).set("b", b"x".to_vec());
        assert_eq!(kv.commit(write).unwrap(), CommitOutcome::CheckFailed);

        assert_eq!(kv.get("a").unwrap().unwrap().value, b"2");
        assert!(kv.get("b").unwrap().is_none());
    }

    #[test]
    fn test_absent_check() {
        let kv = SqliteKv::open_in_memory().unwrap();

        let mut first = AtomicWrite::new();
        first.check("guard", None).set("guard", b"1".to_vec());
        assert!(kv.commit(first).unwrap().is_committed());

        let mut second = AtomicWrite::new();
        second.check("guard", None).set("guard", b"2".to_vec());
        assert_eq!(kv.commit(second).unwrap(), CommitOutcome::CheckFailed);
    }

    #[test]
    fn test_list_prefix_is_ordered_and_scoped() {
        let kv = SqliteKv::open_in_memory().unwrap();
        put(&kv, "idx/2/b", b"");
        put(&kv, "idx/1/a", b"");
        put(&kv, "idx/1/c", b"");
        put(&kv, "idx10/x", b"");

        let keys: Vec<String> = kv
            .list_prefix("idx/1/")
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["idx/1/a", "idx/1/c"]);
        assert_eq!(kv.list_prefix("idx/").unwrap().len(), 3);
    }

    #[test]
    fn test_delete() {
        let kv = SqliteKv::open_in_memory().unwrap();
        put(&kv, "a", b"1");

        let mut write = AtomicWrite::new();
        write.delete("a");
        assert!(kv.commit(write).unwrap().is_committed());
        assert!(kv.get("a").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.db");
        {
            let kv = SqliteKv::open(&path).unwrap();
            put(&kv, "a", b"persisted");
        }
        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get("a").unwrap().unwrap().value, b"persisted");
        assert_eq!(kv.current_version().unwrap(), 1);
    }
}
