//! Disk-backed storage backend over redb.
//!
//! The whole flat key space lives in a single redb table; partitioning is
//! the relational layer's concern. Every mutation runs in its own write
//! transaction, so this backend offers single-key atomicity and nothing
//! more, which is exactly the contract [`KvBackend`] promises.

use std::path::Path;

use redb::{Database, ReadOnlyTable, ReadableTable, TableDefinition};
use snafu::ResultExt;

use super::KvBackend;
use crate::error::{CommitSnafu, Error, Result, StorageSnafu, TableSnafu, TransactionSnafu};

/// The single data table holding the flat key space.
const DATA: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("relkv");

/// Disk-backed key-value backend.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    /// Opens the database at the given path, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { db })
    }

    /// Opens the data table in a fresh read transaction.
    ///
    /// Returns `None` when the table has never been written; a read against
    /// an empty store is an absence, not an error.
    fn read_table(&self) -> Result<Option<ReadOnlyTable<&'static str, &'static [u8]>>> {
        let txn = self.db.begin_read().context(TransactionSnafu)?;
        match txn.open_table(DATA) {
            Ok(table) => Ok(Some(table)),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
            Err(source) => Err(Error::Table { source }),
        }
    }
}

impl KvBackend for RedbBackend {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(DATA).context(TableSnafu)?;
            table.insert(key, value).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(table) = self.read_table()? else {
            return Ok(None);
        };
        let value = table.get(key).context(StorageSnafu)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let txn = self.db.begin_write().context(TransactionSnafu)?;
        let existed = {
            let mut table = txn.open_table(DATA).context(TableSnafu)?;
            let removed = table.remove(key).context(StorageSnafu)?.is_some();
            removed
        };
        txn.commit().context(CommitSnafu)?;
        Ok(existed)
    }

    fn iter_prefix(
        &self,
        prefix: &str,
        visit: &mut dyn FnMut(&str, &[u8]) -> bool,
    ) -> Result<()> {
        let Some(table) = self.read_table()? else {
            return Ok(());
        };

        for item in table.range(prefix..).context(StorageSnafu)? {
            let (key, value) = item.context(StorageSnafu)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            if visit(key, value.value()) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, RedbBackend) {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = RedbBackend::open(dir.path().join("test.redb")).expect("open");
        (dir, backend)
    }

    #[test]
    fn test_get_on_fresh_store() {
        let (_dir, backend) = open_temp();
        assert_eq!(backend.get("missing").expect("get"), None);
        assert!(!backend.delete("missing").expect("delete"));
    }

    #[test]
    fn test_set_get_delete() {
        let (_dir, backend) = open_temp();

        backend.set("a", b"1").expect("set");
        assert_eq!(backend.get("a").expect("get"), Some(b"1".to_vec()));

        assert!(backend.delete("a").expect("delete"));
        assert_eq!(backend.get("a").expect("get"), None);
    }

    #[test]
    fn test_iter_prefix() {
        let (_dir, backend) = open_temp();

        backend.set("tbl%w_1", b"x").expect("set");
        backend.set("tbl%w_2", b"y").expect("set");
        backend.set("tank%used_1", b"").expect("set");

        let mut seen = Vec::new();
        backend
            .iter_prefix("tbl%", &mut |key, value| {
                seen.push((key.to_string(), value.to_vec()));
                false
            })
            .expect("iterate");

        assert_eq!(
            seen,
            vec![
                ("tbl%w_1".to_string(), b"x".to_vec()),
                ("tbl%w_2".to_string(), b"y".to_vec()),
            ]
        );
    }

    #[test]
    fn test_iter_prefix_early_stop() {
        let (_dir, backend) = open_temp();

        for i in 0..5 {
            backend.set(&format!("k{i}"), b"").expect("set");
        }

        let mut visited = 0;
        backend
            .iter_prefix("k", &mut |_, _| {
                visited += 1;
                true
            })
            .expect("iterate");

        assert_eq!(visited, 1);
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.redb");

        {
            let backend = RedbBackend::open(&path).expect("open");
            backend.set("a", b"persisted").expect("set");
        }

        let backend = RedbBackend::open(&path).expect("reopen");
        assert_eq!(backend.get("a").expect("get"), Some(b"persisted".to_vec()));
    }
}
