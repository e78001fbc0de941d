//! Prefix-scoped pass-through over a key-value backend.

use std::sync::Arc;

use crate::backend::KvBackend;
use crate::error::Result;

/// Thin adapter scoping backend operations by a key prefix.
///
/// Holds no logic beyond prefix concatenation: the stored key is always
/// `prefix + key`, and iteration yields keys with the prefix stripped.
/// Clones share the underlying backend.
pub struct RawStore<B> {
    backend: Arc<B>,
}

impl<B: KvBackend> RawStore<B> {
    /// Creates an adapter over the given backend.
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend handle.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Stores a value under `prefix + key`.
    ///
    /// # Errors
    ///
    /// Propagates backend errors unchanged.
    pub fn set(&self, prefix: &str, key: &str, value: &[u8]) -> Result<()> {
        self.backend.set(&format!("{prefix}{key}"), value)
    }

    /// Returns the value stored under `prefix + key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Propagates backend errors unchanged.
    pub fn get(&self, prefix: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.backend.get(&format!("{prefix}{key}"))
    }

    /// Removes `prefix + key`, reporting whether it existed.
    ///
    /// # Errors
    ///
    /// Propagates backend errors unchanged.
    pub fn delete(&self, prefix: &str, key: &str) -> Result<bool> {
        self.backend.delete(&format!("{prefix}{key}"))
    }

    /// Visits every key under `prefix`, with the prefix stripped.
    ///
    /// The visitor returns `true` to stop iteration early.
    ///
    /// # Errors
    ///
    /// Propagates backend errors unchanged.
    pub fn iter_keys(&self, prefix: &str, mut visit: impl FnMut(&str) -> bool) -> Result<()> {
        self.backend
            .iter_prefix(prefix, &mut |key, _| visit(&key[prefix.len()..]))
    }

    /// Visits every entry under `prefix`, keys with the prefix stripped.
    ///
    /// The visitor returns `true` to stop iteration early.
    ///
    /// # Errors
    ///
    /// Propagates backend errors unchanged.
    pub fn iter_entries(
        &self,
        prefix: &str,
        mut visit: impl FnMut(&str, &[u8]) -> bool,
    ) -> Result<()> {
        self.backend
            .iter_prefix(prefix, &mut |key, value| visit(&key[prefix.len()..], value))
    }
}

impl<B> Clone for RawStore<B> {
    fn clone(&self) -> Self {
        Self { backend: Arc::clone(&self.backend) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn raw() -> RawStore<MemoryBackend> {
        RawStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_prefix_scoping() {
        let raw = raw();

        raw.set("tbl%w_", "1", b"a").expect("set");
        raw.set("link%", "w_1@g_9", b"").expect("set");

        assert_eq!(raw.get("tbl%w_", "1").expect("get"), Some(b"a".to_vec()));
        // The same key under another prefix is a different entry.
        assert_eq!(raw.get("link%", "1").expect("get"), None);
    }

    #[test]
    fn test_iter_strips_prefix() {
        let raw = raw();

        raw.set("tbl%w_", "1", b"a").expect("set");
        raw.set("tbl%w_", "2", b"b").expect("set");
        raw.set("tbl%g_", "9", b"c").expect("set");

        let mut ids = Vec::new();
        raw.iter_keys("tbl%w_", |id| {
            ids.push(id.to_string());
            false
        })
        .expect("iterate");

        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_iter_entries_early_stop() {
        let raw = raw();

        for i in 0..4 {
            raw.set("p_", &i.to_string(), b"v").expect("set");
        }

        let mut visited = 0;
        raw.iter_entries("p_", |_, value| {
            assert_eq!(value, b"v");
            visited += 1;
            visited == 2
        })
        .expect("iterate");

        assert_eq!(visited, 2);
    }

    #[test]
    fn test_delete_reports_existence() {
        let raw = raw();

        raw.set("p_", "1", b"v").expect("set");
        assert!(raw.delete("p_", "1").expect("delete"));
        assert!(!raw.delete("p_", "1").expect("delete again"));
    }

    #[test]
    fn test_clone_shares_backend() {
        let a = raw();
        let b = a.clone();

        a.set("p_", "1", b"v").expect("set");
        assert_eq!(b.get("p_", "1").expect("get"), Some(b"v".to_vec()));
    }
}
