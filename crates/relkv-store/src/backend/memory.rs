//! In-memory storage backend for testing and ephemeral stores.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use super::KvBackend;
use crate::error::Result;

/// In-memory storage backend.
///
/// All data is kept in a sorted map and lost when the backend is dropped.
/// Prefix iteration visits a snapshot of the matching range, so visitors may
/// reenter the backend without deadlocking.
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self { entries: RwLock::new(BTreeMap::new()) }
    }

    /// Returns the number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes all entries (for testing).
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for MemoryBackend {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn iter_prefix(
        &self,
        prefix: &str,
        visit: &mut dyn FnMut(&str, &[u8]) -> bool,
    ) -> Result<()> {
        let snapshot: Vec<(String, Vec<u8>)> = {
            let entries = self.entries.read();
            entries
                .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };

        for (key, value) in &snapshot {
            if visit(key, value) {
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

    #[test]
    fn test_set_get_delete() {
        let backend = MemoryBackend::new();

        backend.set("a", b"1").expect("set");
        assert_eq!(backend.get("a").expect("get"), Some(b"1".to_vec()));

        assert!(backend.delete("a").expect("delete"));
        assert!(!backend.delete("a").expect("delete again"));
        assert_eq!(backend.get("a").expect("get"), None);
    }

    #[test]
    fn test_overwrite() {
        let backend = MemoryBackend::new();

        backend.set("a", b"1").expect("set");
        backend.set("a", b"2").expect("overwrite");
        assert_eq!(backend.get("a").expect("get"), Some(b"2".to_vec()));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_iter_prefix_isolation() {
        let backend = MemoryBackend::new();

        backend.set("tbl%a_1", b"x").expect("set");
        backend.set("tbl%a_2", b"y").expect("set");
        backend.set("link%a_1@b_2", b"").expect("set");

        let mut seen = Vec::new();
        backend
            .iter_prefix("tbl%", &mut |key, _| {
                seen.push(key.to_string());
                false
            })
            .expect("iterate");

        assert_eq!(seen, vec!["tbl%a_1".to_string(), "tbl%a_2".to_string()]);
    }

    #[test]
    fn test_iter_prefix_early_stop() {
        let backend = MemoryBackend::new();

        for i in 0..10 {
            backend.set(&format!("k{i}"), b"").expect("set");
        }

        let mut visited = 0;
        backend
            .iter_prefix("k", &mut |_, _| {
                visited += 1;
                visited == 3
            })
            .expect("iterate");

        assert_eq!(visited, 3);
    }

    #[test]
    fn test_visitor_may_reenter() {
        let backend = MemoryBackend::new();

        backend.set("a", b"1").expect("set");
        backend.set("b", b"2").expect("set");

        let mut ok = true;
        backend
            .iter_prefix("", &mut |key, _| {
                // Reads and writes during iteration must not deadlock.
                ok &= backend.get(key).expect("reentrant get").is_some();
                backend.set("c", b"3").expect("reentrant set");
                false
            })
            .expect("iterate");

        assert!(ok);
        assert_eq!(backend.get("c").expect("get"), Some(b"3".to_vec()));
    }
}
