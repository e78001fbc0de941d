//! Raw key-value boundary for relkv.
//!
//! This crate provides:
//! - [`KvBackend`], the trait the relational layer is written against
//! - [`MemoryBackend`], an in-memory backend for tests and ephemeral stores
//! - [`RedbBackend`], a disk-backed backend over redb
//! - [`RawStore`], the prefix-scoped pass-through adapter
//!
//! Backends make no ordering, durability, or multi-key atomicity promises
//! beyond single-key read-your-writes. Errors propagate unchanged; nothing
//! here retries.

#![deny(unsafe_code)]

mod backend;
mod error;
mod raw;

pub use backend::{KvBackend, MemoryBackend, RedbBackend};
pub use error::{Error, Result};
pub use raw::RawStore;
