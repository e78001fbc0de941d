//! The record trait and record references.
//!
//! A record type declares its table name and a field listing explicitly
//! instead of relying on runtime type introspection. The field listing is
//! only consulted for debug dumps; it carries no schema semantics.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A typed value that can be stored in a table.
///
/// # Preconditions
///
/// `TABLE` must not contain the configured delimiter or link-delimiter
/// characters. Violating this corrupts key parsing and is a caller error,
/// not a runtime-detected one.
pub trait Record: Serialize + DeserializeOwned {
    /// Logical table this record type belongs to.
    const TABLE: &'static str;

    /// Field names and rendered values, used for debug dumps.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

/// A reference to a record: its table name and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    /// Table containing the record.
    pub table: String,
    /// Identifier of the record within its table.
    pub id: String,
}

impl RecordRef {
    /// Creates a reference from a table name and identifier.
    pub fn new(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self { table: table.into(), id: id.into() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Gadget {
        label: String,
    }

    impl Record for Gadget {
        const TABLE: &'static str = "gadgets";

        fn fields(&self) -> Vec<(&'static str, String)> {
            vec![("label", self.label.clone())]
        }
    }

    #[test]
    fn test_record_metadata() {
        let gadget = Gadget { label: "sprocket".to_string() };
        assert_eq!(Gadget::TABLE, "gadgets");
        assert_eq!(gadget.fields(), vec![("label", "sprocket".to_string())]);
    }

    #[test]
    fn test_record_ref_equality() {
        let a = RecordRef::new("gadgets", "9");
        let b = RecordRef::new("gadgets".to_string(), "9".to_string());
        assert_eq!(a, b);
        assert_ne!(a, RecordRef::new("gadgets", "10"));
    }
}
