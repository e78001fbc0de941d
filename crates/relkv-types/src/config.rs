//! Keyspace configuration.
//!
//! One flat string key space is partitioned into table records, link
//! entries, and identifier-pool bookkeeping by a set of reserved prefixes.
//! The set is validated once at construction; after that the key codec
//! treats it as law. Defaults match the original on-disk layout, so stores
//! written with the defaults remain readable across versions.

use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
///
/// Returned when a prefix or delimiter choice could produce colliding keys
/// across partitions.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid keyspace config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

fn default_table_prefix() -> String {
    "tbl%".to_string()
}

fn default_link_prefix() -> String {
    "link%".to_string()
}

fn default_available_prefix() -> String {
    "tank%avlb_".to_string()
}

fn default_used_prefix() -> String {
    "tank%used_".to_string()
}

fn default_sequence_prefix() -> String {
    "tank%meta_".to_string()
}

fn default_delimiter() -> String {
    "_".to_string()
}

fn default_link_delimiter() -> String {
    "@".to_string()
}

fn default_batch_size() -> u64 {
    100
}

/// Reserved prefixes, delimiters, and allocator tuning for one store.
///
/// # Validation Rules
///
/// - every prefix is non-empty, and no prefix is a prefix of another
/// - the delimiter and link delimiter are non-empty and distinct
/// - `batch_size` is at least 1
///
/// Table names and identifiers must not contain the delimiter or link
/// delimiter characters; that contract is the caller's to uphold and is not
/// checked at runtime.
///
/// # Example
///
/// ```
/// # use relkv_types::KeyspaceConfig;
/// let config = KeyspaceConfig::builder()
///     .batch_size(10)
///     .build()
///     .expect("valid keyspace config");
/// assert_eq!(config.table_prefix, "tbl%");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceConfig {
    /// Prefix of the table-record partition.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Prefix of the link partition.
    #[serde(default = "default_link_prefix")]
    pub link_prefix: String,
    /// Prefix of the allocator's available-identifier pool.
    #[serde(default = "default_available_prefix")]
    pub available_prefix: String,
    /// Prefix of the allocator's used-identifier pool.
    #[serde(default = "default_used_prefix")]
    pub used_prefix: String,
    /// Prefix of the allocator's persisted sequence cursor.
    #[serde(default = "default_sequence_prefix")]
    pub sequence_prefix: String,
    /// Delimiter between table name and identifier within a key.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Delimiter between the two endpoints of a link key.
    #[serde(default = "default_link_delimiter")]
    pub link_delimiter: String,
    /// Number of fresh identifiers generated per allocator batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

#[bon::bon]
impl KeyspaceConfig {
    /// Creates a new keyspace configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the prefix set can collide or
    /// a delimiter is unusable.
    #[builder]
    pub fn new(
        #[builder(default = default_table_prefix(), into)] table_prefix: String,
        #[builder(default = default_link_prefix(), into)] link_prefix: String,
        #[builder(default = default_available_prefix(), into)] available_prefix: String,
        #[builder(default = default_used_prefix(), into)] used_prefix: String,
        #[builder(default = default_sequence_prefix(), into)] sequence_prefix: String,
        #[builder(default = default_delimiter(), into)] delimiter: String,
        #[builder(default = default_link_delimiter(), into)] link_delimiter: String,
        #[builder(default = default_batch_size())] batch_size: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            table_prefix,
            link_prefix,
            available_prefix,
            used_prefix,
            sequence_prefix,
            delimiter,
            link_delimiter,
            batch_size,
        };
        config.validate()?;
        Ok(config)
    }
}

impl KeyspaceConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure the prefix set is collision-free.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any rule is violated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefixes = [
            ("table_prefix", &self.table_prefix),
            ("link_prefix", &self.link_prefix),
            ("available_prefix", &self.available_prefix),
            ("used_prefix", &self.used_prefix),
            ("sequence_prefix", &self.sequence_prefix),
        ];

        for (name, value) in &prefixes {
            if value.is_empty() {
                return Err(ConfigError::Validation {
                    message: format!("{name} must not be empty"),
                });
            }
        }

        // No partition prefix may be a prefix of another, or a key written
        // into one partition could be observed while scanning a different one.
        for (i, (name_a, a)) in prefixes.iter().enumerate() {
            for (name_b, b) in prefixes.iter().skip(i + 1) {
                if a.starts_with(b.as_str()) || b.starts_with(a.as_str()) {
                    return Err(ConfigError::Validation {
                        message: format!(
                            "{name_a} ({a:?}) and {name_b} ({b:?}) overlap"
                        ),
                    });
                }
            }
        }

        if self.delimiter.is_empty() || self.link_delimiter.is_empty() {
            return Err(ConfigError::Validation {
                message: "delimiters must not be empty".to_string(),
            });
        }
        if self.delimiter == self.link_delimiter {
            return Err(ConfigError::Validation {
                message: format!(
                    "delimiter and link_delimiter must differ, both are {:?}",
                    self.delimiter
                ),
            });
        }

        if self.batch_size == 0 {
            return Err(ConfigError::Validation {
                message: "batch_size must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            link_prefix: default_link_prefix(),
            available_prefix: default_available_prefix(),
            used_prefix: default_used_prefix(),
            sequence_prefix: default_sequence_prefix(),
            delimiter: default_delimiter(),
            link_delimiter: default_link_delimiter(),
            batch_size: default_batch_size(),
        }
    }
}
