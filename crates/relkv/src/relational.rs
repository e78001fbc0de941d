//! The relational store façade.
//!
//! Composes the key codec, the tagged record codec, the prefix-scoped raw
//! store, and the identifier allocator into table CRUD, predicate scans,
//! and mirrored link management.
//!
//! # Consistency gaps
//!
//! Multi-step operations are sequences of single-key writes with no
//! transaction around them: `insert` allocates then stores, `link` writes
//! two mirrored entries, `deep_delete` deletes then scans then removes.
//! A crash or concurrent interleaving between steps can strand one side of
//! a mirrored pair or leak an allocated identifier. Callers needing strict
//! consistency must serialize access per record externally; this layer
//! deliberately does not assume a transactional backend.

use std::sync::Arc;

use snafu::{ResultExt, Snafu};

use relkv_store::{KvBackend, RawStore};
use relkv_types::{codec, CodecError, ConfigError, KeyspaceConfig, Record, RecordRef};

use crate::allocator::{AllocatorError, IdentifierAllocator};
use crate::keys::Keyspace;

/// Errors returned by relational store operations.
#[derive(Debug, Snafu)]
pub enum StoreError {
    /// Underlying storage operation failed.
    #[snafu(display("Storage error: {source}"))]
    Store { source: relkv_store::Error },

    /// Serialization or deserialization failed.
    #[snafu(display("Codec error: {source}"))]
    Codec { source: CodecError },

    /// Identifier allocation failed.
    #[snafu(display("Allocator error: {source}"))]
    Allocator { source: AllocatorError },
}

/// Result type for relational store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Table-like collections of typed records with mirrored links, over any
/// [`KvBackend`].
///
/// Absent records are a normal outcome (`Ok(None)`), not an error; deletes
/// of absent records are no-op successes.
pub struct RelationalStore<B: KvBackend> {
    raw: RawStore<B>,
    keys: Arc<Keyspace>,
    allocator: IdentifierAllocator<B>,
}

impl<B: KvBackend> RelationalStore<B> {
    /// Creates a store over the given backend, validating the keyspace
    /// configuration once.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the prefix set can collide.
    pub fn new(backend: Arc<B>, config: KeyspaceConfig) -> std::result::Result<Self, ConfigError> {
        let keys = Arc::new(Keyspace::new(config)?);
        let raw = RawStore::new(backend);
        let allocator = IdentifierAllocator::new(raw.clone(), Arc::clone(&keys));
        Ok(Self { raw, keys, allocator })
    }

    /// Returns the prefix-scoped raw store, for callers needing the
    /// key-value primitives directly.
    pub fn raw(&self) -> &RawStore<B> {
        &self.raw
    }

    /// Returns the key codec.
    pub fn keyspace(&self) -> &Keyspace {
        &self.keys
    }

    // =========================================================================
    // Record CRUD
    // =========================================================================

    /// Stores a record under a freshly allocated identifier and returns it.
    ///
    /// Allocate-then-store is not atomic: a failure after allocation leaks
    /// the identifier into the used pool.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Allocator` if allocation fails,
    /// `StoreError::Codec` if encoding fails, `StoreError::Store` if the
    /// write fails.
    pub fn insert<T: Record>(&self, record: &T) -> Result<String> {
        let id = self.allocator.next().context(AllocatorSnafu)?;
        let bytes = codec::encode_tagged(T::TABLE, record).context(CodecSnafu)?;
        self.raw
            .set(&self.keys.records(T::TABLE), &id, &bytes)
            .context(StoreSnafu)?;
        Ok(id)
    }

    /// Stores (or overwrites) a record under a caller-chosen identifier.
    ///
    /// The allocator is not consulted, so caller-chosen identifiers are
    /// never tracked as used; callers mixing manual and auto-generated
    /// identifiers in one table must avoid manual values that collide with
    /// future auto-generated ones.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Codec` if encoding fails, `StoreError::Store`
    /// if the write fails.
    pub fn set<T: Record>(&self, id: &str, record: &T) -> Result<()> {
        let bytes = codec::encode_tagged(T::TABLE, record).context(CodecSnafu)?;
        self.raw
            .set(&self.keys.records(T::TABLE), id, &bytes)
            .context(StoreSnafu)?;
        Ok(())
    }

    /// Returns a record by identifier, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if the read fails, `StoreError::Codec`
    /// if the stored value cannot be decoded as `T`.
    pub fn get<T: Record>(&self, id: &str) -> Result<Option<T>> {
        match self
            .raw
            .get(&self.keys.records(T::TABLE), id)
            .context(StoreSnafu)?
        {
            Some(bytes) => {
                let record = codec::decode_tagged(T::TABLE, &bytes).context(CodecSnafu)?;
                Ok(Some(record))
            },
            None => Ok(None),
        }
    }

    /// Reads a record, applies the editor, and writes the result back.
    ///
    /// Returns the new value, or `None` when the record is absent; the
    /// editor is not invoked and nothing is created.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` or `StoreError::Codec` as for
    /// [`get`](Self::get) and [`set`](Self::set).
    pub fn update<T: Record>(&self, id: &str, editor: impl FnOnce(T) -> T) -> Result<Option<T>> {
        match self.get::<T>(id)? {
            Some(current) => {
                let replacement = editor(current);
                self.set(id, &replacement)?;
                Ok(Some(replacement))
            },
            None => Ok(None),
        }
    }

    /// Removes a record. Idempotent; absent records are a no-op success.
    ///
    /// Links referencing the record are left behind; use
    /// [`deep_delete`](Self::deep_delete) when links exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if the delete fails.
    pub fn delete<T: Record>(&self, id: &str) -> Result<()> {
        self.raw
            .delete(&self.keys.records(T::TABLE), id)
            .context(StoreSnafu)?;
        Ok(())
    }

    /// Removes a record and both mirrored entries of every link with this
    /// record as either endpoint. Idempotent.
    ///
    /// The scan covers the whole link partition rather than just the
    /// forward prefix, so half-written pairs (one mirrored side missing)
    /// are collected too.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if a read or delete fails.
    pub fn deep_delete<T: Record>(&self, id: &str) -> Result<()> {
        self.delete::<T>(id)?;

        let mut doomed = Vec::new();
        self.raw
            .iter_keys(self.keys.links(), |key| {
                if let Some((source, target)) = self.keys.parse_link(key) {
                    let hit = (source.table == T::TABLE && source.id == id)
                        || (target.table == T::TABLE && target.id == id);
                    if hit {
                        doomed.push((source, target));
                    }
                }
                false
            })
            .context(StoreSnafu)?;

        for (source, target) in &doomed {
            let (forward, mirror) =
                self.keys.link_pair(&source.table, &source.id, &target.table, &target.id);
            self.raw.delete(self.keys.links(), &forward).context(StoreSnafu)?;
            self.raw.delete(self.keys.links(), &mirror).context(StoreSnafu)?;
        }
        if !doomed.is_empty() {
            tracing::debug!(
                table = T::TABLE,
                id,
                links = doomed.len(),
                "removed links cascading from record deletion"
            );
        }
        Ok(())
    }

    /// Checks whether a record exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if the read fails.
    pub fn exists<T: Record>(&self, id: &str) -> Result<bool> {
        Ok(self
            .raw
            .get(&self.keys.records(T::TABLE), id)
            .context(StoreSnafu)?
            .is_some())
    }

    /// Counts the records of a table.
    ///
    /// Linear in the table size; there are no cached counters. Callers
    /// needing fast counts must cache externally.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if iteration fails.
    pub fn count<T: Record>(&self) -> Result<usize> {
        let mut count = 0;
        self.raw
            .iter_keys(&self.keys.records(T::TABLE), |_| {
                count += 1;
                false
            })
            .context(StoreSnafu)?;
        Ok(count)
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// Visits every record of a table in backend iteration order.
    ///
    /// The visitor returns `true` to stop early.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if iteration fails, `StoreError::Codec`
    /// if a stored value cannot be decoded.
    pub fn for_each<T: Record>(&self, mut visit: impl FnMut(&str, T) -> bool) -> Result<()> {
        let prefix = self.keys.records(T::TABLE);
        let mut decode_failure = None;
        self.raw
            .iter_entries(&prefix, |id, bytes| {
                match codec::decode_tagged::<T>(T::TABLE, bytes) {
                    Ok(record) => visit(id, record),
                    Err(source) => {
                        decode_failure = Some(source);
                        true
                    },
                }
            })
            .context(StoreSnafu)?;
        match decode_failure {
            Some(source) => Err(StoreError::Codec { source }),
            None => Ok(()),
        }
    }

    /// Returns the first record matching the predicate, with its
    /// identifier. Stops scanning at the first match.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn find_first<T: Record>(
        &self,
        mut predicate: impl FnMut(&str, &T) -> bool,
    ) -> Result<Option<(String, T)>> {
        let mut found = None;
        self.for_each::<T>(|id, record| {
            if predicate(id, &record) {
                found = Some((id.to_string(), record));
                true
            } else {
                false
            }
        })?;
        Ok(found)
    }

    /// Returns every record matching the predicate, with identifiers.
    ///
    /// # Errors
    ///
    /// As for [`for_each`](Self::for_each).
    pub fn find_all<T: Record>(
        &self,
        mut predicate: impl FnMut(&str, &T) -> bool,
    ) -> Result<Vec<(String, T)>> {
        let mut matches = Vec::new();
        self.for_each::<T>(|id, record| {
            if predicate(id, &record) {
                matches.push((id.to_string(), record));
            }
            false
        })?;
        Ok(matches)
    }

    /// Renders every record of a table as a debug dump, one line per
    /// record, using the type's field metadata.
    ///
    /// # Errors
    ///
    /// Fails only on backend read or decode errors, as for
    /// [`for_each`](Self::for_each).
    pub fn dump<T: Record>(&self) -> Result<String> {
        let mut out = String::new();
        self.for_each::<T>(|id, record| {
            out.push_str(&format!("{} | {}", T::TABLE, id));
            for (name, value) in record.fields() {
                out.push_str(&format!(" | {name}: {value}"));
            }
            out.push('\n');
            false
        })?;
        Ok(out)
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Records an undirected link between two records as a mirrored pair of
    /// entries, so either endpoint can be traversed.
    ///
    /// The two writes are not atomic at the backend level (see the module
    /// documentation). Existence of the endpoints is not checked.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if a write fails.
    pub fn link<L: Record, R: Record>(&self, id_l: &str, id_r: &str) -> Result<()> {
        let (forward, mirror) = self.keys.link_pair(L::TABLE, id_l, R::TABLE, id_r);
        self.raw.set(self.keys.links(), &forward, &[]).context(StoreSnafu)?;
        self.raw.set(self.keys.links(), &mirror, &[]).context(StoreSnafu)?;
        Ok(())
    }

    /// Removes both mirrored entries of a link. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if a delete fails.
    pub fn unlink<L: Record, R: Record>(&self, id_l: &str, id_r: &str) -> Result<()> {
        let (forward, mirror) = self.keys.link_pair(L::TABLE, id_l, R::TABLE, id_r);
        self.raw.delete(self.keys.links(), &forward).context(StoreSnafu)?;
        self.raw.delete(self.keys.links(), &mirror).context(StoreSnafu)?;
        Ok(())
    }

    /// Checks whether two records are linked.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if the read fails.
    pub fn is_linked<L: Record, R: Record>(&self, id_l: &str, id_r: &str) -> Result<bool> {
        let (forward, _) = self.keys.link_pair(L::TABLE, id_l, R::TABLE, id_r);
        Ok(self
            .raw
            .get(self.keys.links(), &forward)
            .context(StoreSnafu)?
            .is_some())
    }

    /// Returns references to every record linked to the given one,
    /// discovered from the forward entries keyed by this endpoint.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Store` if iteration fails.
    pub fn links_of<T: Record>(&self, id: &str) -> Result<Vec<RecordRef>> {
        let prefix = format!(
            "{}{}",
            self.keys.links(),
            self.keys.forward_prefix(T::TABLE, id)
        );
        let mut targets = Vec::new();
        self.raw
            .iter_keys(&prefix, |endpoint| {
                if let Some(target) = self.keys.parse_endpoint(endpoint) {
                    targets.push(target);
                }
                false
            })
            .context(StoreSnafu)?;
        Ok(targets)
    }

    // =========================================================================
    // Identifier pool surface
    // =========================================================================

    /// Reserves and returns a fresh identifier without storing anything
    /// under it; see [`IdentifierAllocator::next`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Allocator` if a backend operation fails.
    pub fn next_identifier(&self) -> Result<String> {
        self.allocator.next().context(AllocatorSnafu)
    }

    /// Returns identifiers to the allocator's available pool; see
    /// [`IdentifierAllocator::free`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Allocator` if a backend operation fails.
    pub fn free_identifiers<I>(&self, ids: I) -> Result<Vec<AllocatorError>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.allocator.free(ids).context(AllocatorSnafu)
    }

    /// Evicts stale identifiers from the allocator's available pool; see
    /// [`IdentifierAllocator::prune_unused`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Allocator` if a backend operation fails.
    pub fn prune_identifier_pool(&self) -> Result<usize> {
        self.allocator.prune_unused().context(AllocatorSnafu)
    }
}
