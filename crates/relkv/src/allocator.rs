//! Identifier allocation with batch generation and recycling.
//!
//! The allocator owns two prefix-scoped sets persisted through the raw
//! store: `available` (pre-generated, unissued) and `used` (currently
//! live). An identifier is in at most one set at any time. Freshness comes
//! from a persisted sequence cursor: each batch takes `batch_size`
//! consecutive decimal values, so one backend round trip of bookkeeping is
//! amortized across a whole batch of allocations.
//!
//! Uniqueness is scoped to currently-live identifiers: a freed identifier
//! returns to `available` and may be handed out again.

use std::sync::Arc;

use parking_lot::Mutex;
use snafu::{ResultExt, Snafu};

use relkv_store::{KvBackend, RawStore};
use relkv_types::codec;
use relkv_types::CodecError;

use crate::keys::Keyspace;

/// Key of the sequence cursor within its bookkeeping partition.
const SEQUENCE_KEY: &str = "next";

/// Errors returned by allocator operations.
#[derive(Debug, Snafu)]
pub enum AllocatorError {
    /// Underlying storage operation failed.
    #[snafu(display("Storage error: {source}"))]
    Store { source: relkv_store::Error },

    /// The persisted sequence cursor could not be decoded.
    #[snafu(display("Codec error: {source}"))]
    Codec { source: CodecError },

    /// A freed identifier was not currently allocated.
    #[snafu(display("Identifier {id:?} is not currently allocated"))]
    NotAllocated { id: String },
}

/// Result type for allocator operations.
pub type Result<T> = std::result::Result<T, AllocatorError>;

/// Batch-allocating identifier pool over a raw key-value store.
///
/// A mutex serializes every pool mutation, so concurrent [`next`] calls on
/// the same allocator never hand out the same identifier twice. Separate
/// allocator instances over the same backend are *not* coordinated; callers
/// wanting multi-process allocation must serialize externally.
///
/// [`next`]: IdentifierAllocator::next
pub struct IdentifierAllocator<B: KvBackend> {
    raw: RawStore<B>,
    keys: Arc<Keyspace>,
    lock: Mutex<()>,
}

impl<B: KvBackend> IdentifierAllocator<B> {
    /// Creates an allocator over the given raw store and keyspace.
    pub fn new(raw: RawStore<B>, keys: Arc<Keyspace>) -> Self {
        Self { raw, keys, lock: Mutex::new(()) }
    }

    /// Returns a fresh identifier, marking it used.
    ///
    /// Pops any member of the available pool; when the pool is empty, a new
    /// batch of `batch_size` identifiers is generated from the sequence
    /// cursor, one is returned and the rest become available.
    ///
    /// # Errors
    ///
    /// Returns `AllocatorError::Store` if a backend operation fails. A
    /// failure during batch generation surfaces instead of returning a
    /// partially-committed batch.
    pub fn next(&self) -> Result<String> {
        let _guard = self.lock.lock();

        let mut popped = None;
        self.raw
            .iter_keys(self.keys.available(), |id| {
                popped = Some(id.to_string());
                true
            })
            .context(StoreSnafu)?;

        if let Some(id) = popped {
            self.raw.delete(self.keys.available(), &id).context(StoreSnafu)?;
            self.raw.set(self.keys.used(), &id, &[]).context(StoreSnafu)?;
            return Ok(id);
        }

        self.generate_batch()
    }

    /// Returns identifiers to the available pool.
    ///
    /// Identifiers not currently used are collected as non-fatal
    /// [`AllocatorError::NotAllocated`] failures; one bad identifier never
    /// aborts freeing the rest.
    ///
    /// # Errors
    ///
    /// Returns `AllocatorError::Store` if a backend operation fails.
    pub fn free<I>(&self, ids: I) -> Result<Vec<AllocatorError>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let _guard = self.lock.lock();

        let mut failures = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if self.raw.delete(self.keys.used(), id).context(StoreSnafu)? {
                self.raw.set(self.keys.available(), id, &[]).context(StoreSnafu)?;
            } else {
                failures.push(AllocatorError::NotAllocated { id: id.to_string() });
            }
        }
        Ok(failures)
    }

    /// Evicts stale identifiers from the available pool.
    ///
    /// Anything beyond one batch worth of pre-generated identifiers is
    /// considered stale. Used identifiers are never touched, and evicted
    /// identifiers that were never issued may be regenerated later; the
    /// sequence cursor only moves forward. Returns the number evicted.
    ///
    /// # Errors
    ///
    /// Returns `AllocatorError::Store` if a backend operation fails.
    pub fn prune_unused(&self) -> Result<usize> {
        let _guard = self.lock.lock();

        let keep = self.keys.config().batch_size as usize;
        let mut stale = Vec::new();
        let mut seen = 0usize;
        self.raw
            .iter_keys(self.keys.available(), |id| {
                seen += 1;
                if seen > keep {
                    stale.push(id.to_string());
                }
                false
            })
            .context(StoreSnafu)?;

        for id in &stale {
            self.raw.delete(self.keys.available(), id).context(StoreSnafu)?;
        }
        if !stale.is_empty() {
            tracing::debug!(pruned = stale.len(), "evicted stale available identifiers");
        }
        Ok(stale.len())
    }

    /// Generates a fresh batch under the pool lock.
    fn generate_batch(&self) -> Result<String> {
        let size = self.keys.config().batch_size;
        let start = match self
            .raw
            .get(self.keys.sequence(), SEQUENCE_KEY)
            .context(StoreSnafu)?
        {
            Some(bytes) => codec::decode::<u64>(&bytes).context(CodecSnafu)?,
            None => 1,
        };

        // The cursor is advanced and persisted before any batch member is
        // written: a failure below loses identifiers but can never lead to
        // one being issued twice.
        let next = start + size;
        let encoded = codec::encode(&next).context(CodecSnafu)?;
        self.raw
            .set(self.keys.sequence(), SEQUENCE_KEY, &encoded)
            .context(StoreSnafu)?;

        for n in start + 1..next {
            self.raw
                .set(self.keys.available(), &n.to_string(), &[])
                .context(StoreSnafu)?;
        }

        let id = start.to_string();
        self.raw.set(self.keys.used(), &id, &[]).context(StoreSnafu)?;
        tracing::debug!(start, size, "generated fresh identifier batch");
        Ok(id)
    }
}
