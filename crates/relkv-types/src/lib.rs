//! Core types for relkv.
//!
//! This crate provides the foundations shared by the storage layers:
//! - The [`Record`] trait binding a serializable type to its table name and
//!   debug metadata
//! - The tagged postcard codec used to persist records
//! - [`KeyspaceConfig`], the validated set of reserved prefixes and
//!   delimiters that partition the flat key space

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod record;

pub use codec::{decode, decode_tagged, encode, encode_tagged, CodecError};
pub use config::{ConfigError, KeyspaceConfig};
pub use record::{Record, RecordRef};
