//! Typed relational records over a raw key-value backend.
//!
//! This crate sits between the raw key-value boundary (`relkv-store`) and
//! application code, providing:
//!
//! - Table CRUD for types implementing [`Record`], with auto-generated or
//!   caller-supplied identifiers
//! - A batch-allocating, recycling identifier allocator
//! - Mirrored bidirectional links between records, traversable from either
//!   endpoint without a reverse index
//! - Linear scans with caller-supplied predicates
//!
//! It is an in-process indexing convenience, not a database engine: there is
//! no query planner, no join engine, and no multi-key atomicity. Multi-step
//! operations (insert, link, deep delete) are sequences of single-key writes;
//! see [`RelationalStore`] for the documented consistency gaps.

#![deny(unsafe_code)]

mod allocator;
mod keys;
mod relational;

pub use allocator::{AllocatorError, IdentifierAllocator};
pub use keys::Keyspace;
pub use relational::{RelationalStore, StoreError};
// Re-export the boundary and core types for convenience.
pub use relkv_store::{Error as BackendError, KvBackend, MemoryBackend, RawStore, RedbBackend};
pub use relkv_types::{CodecError, ConfigError, KeyspaceConfig, Record, RecordRef};
