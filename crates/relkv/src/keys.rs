//! Key encoding for the partitioned key space.
//!
//! A record lives under `{table_prefix}{table}{delimiter}{id}`. A link
//! between two records is two mirrored entries under the link partition,
//! `{endpoint}{link_delimiter}{endpoint}` with the endpoints swapped, where
//! an endpoint is `{table}{delimiter}{id}`. Either side of a link can
//! therefore be found with a forward prefix scan, no reverse index needed.
//!
//! All functions are pure over a validated [`KeyspaceConfig`]. Table names
//! and identifiers must not contain the delimiter characters; that is a
//! documented caller precondition, not a runtime check.

use relkv_types::{ConfigError, KeyspaceConfig, RecordRef};

/// Key codec over a validated keyspace configuration.
#[derive(Debug, Clone)]
pub struct Keyspace {
    config: KeyspaceConfig,
}

impl Keyspace {
    /// Validates the configuration and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the prefix set can collide.
    pub fn new(config: KeyspaceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &KeyspaceConfig {
        &self.config
    }

    /// Returns the scan prefix covering every record of a table.
    pub fn records(&self, table: &str) -> String {
        format!("{}{}{}", self.config.table_prefix, table, self.config.delimiter)
    }

    /// Returns the full key of one record.
    pub fn record_key(&self, table: &str, id: &str) -> String {
        format!("{}{}", self.records(table), id)
    }

    /// Returns the link partition prefix.
    pub fn links(&self) -> &str {
        &self.config.link_prefix
    }

    /// Returns the available-identifier pool prefix.
    pub fn available(&self) -> &str {
        &self.config.available_prefix
    }

    /// Returns the used-identifier pool prefix.
    pub fn used(&self) -> &str {
        &self.config.used_prefix
    }

    /// Returns the allocator sequence-cursor prefix.
    pub fn sequence(&self) -> &str {
        &self.config.sequence_prefix
    }

    /// Renders one link endpoint.
    pub fn endpoint(&self, table: &str, id: &str) -> String {
        format!("{}{}{}", table, self.config.delimiter, id)
    }

    /// Returns the prefix selecting all links going out of one endpoint.
    pub fn forward_prefix(&self, table: &str, id: &str) -> String {
        format!("{}{}", self.endpoint(table, id), self.config.link_delimiter)
    }

    /// Returns both mirrored link-partition keys for an undirected link.
    ///
    /// Construction is symmetric: swapping the two endpoints yields the same
    /// pair in swapped order.
    pub fn link_pair(
        &self,
        table_a: &str,
        id_a: &str,
        table_b: &str,
        id_b: &str,
    ) -> (String, String) {
        let a = self.endpoint(table_a, id_a);
        let b = self.endpoint(table_b, id_b);
        let delim = &self.config.link_delimiter;
        (format!("{a}{delim}{b}"), format!("{b}{delim}{a}"))
    }

    /// Parses a link endpoint back into a record reference.
    ///
    /// Returns `None` on malformed input.
    pub fn parse_endpoint(&self, endpoint: &str) -> Option<RecordRef> {
        let (table, id) = endpoint.split_once(self.config.delimiter.as_str())?;
        if table.is_empty() || id.is_empty() {
            return None;
        }
        Some(RecordRef::new(table, id))
    }

    /// Parses a link-partition key into its `(source, target)` endpoints.
    ///
    /// Returns `None` on malformed input.
    pub fn parse_link(&self, key: &str) -> Option<(RecordRef, RecordRef)> {
        let (source, target) = key.split_once(self.config.link_delimiter.as_str())?;
        Some((self.parse_endpoint(source)?, self.parse_endpoint(target)?))
    }
}
