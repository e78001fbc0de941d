//! Centralized serialization and deserialization functions.
//!
//! Records are persisted as a postcard envelope `(tag, body)` where the tag
//! is the record type's table name. Decoding verifies the stored tag against
//! the expected one, so a value written under one record type can never be
//! silently decoded as another. Plain `encode`/`decode` variants exist for
//! untagged bookkeeping values such as the allocator's sequence cursor.

use serde::{de::DeserializeOwned, Serialize};
use snafu::{ensure, ResultExt, Snafu};

/// Error type for codec operations.
#[derive(Debug, Snafu)]
pub enum CodecError {
    /// Encoding failed.
    #[snafu(display("Encoding failed: {source}"))]
    Encode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Decoding failed.
    #[snafu(display("Decoding failed: {source}"))]
    Decode {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// The stored type tag does not match the expected record type.
    #[snafu(display("Type tag mismatch: expected {expected:?}, found {found:?}"))]
    TagMismatch {
        /// The tag the caller asked to decode.
        expected: String,
        /// The tag found in the stored envelope.
        found: String,
    },
}

/// Encodes a value to bytes using postcard serialization.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails. A failed encode never
/// yields an empty success value.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(value).context(EncodeSnafu)
}

/// Decodes bytes to a value using postcard deserialization.
///
/// # Errors
///
/// Returns `CodecError::Decode` on malformed or truncated input.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    postcard::from_bytes(bytes).context(DecodeSnafu)
}

/// Encodes a value wrapped in a `(tag, body)` envelope.
///
/// The inverse of [`decode_tagged`] for every value this function accepts.
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization of the value or the
/// envelope fails.
pub fn encode_tagged<T: Serialize>(tag: &str, value: &T) -> Result<Vec<u8>, CodecError> {
    let body = encode(value)?;
    postcard::to_allocvec(&(tag, body.as_slice())).context(EncodeSnafu)
}

/// Decodes a `(tag, body)` envelope, verifying the stored tag.
///
/// # Errors
///
/// Returns `CodecError::Decode` on malformed or truncated input and
/// `CodecError::TagMismatch` when the stored tag does not resolve to the
/// expected record type.
pub fn decode_tagged<T: DeserializeOwned>(tag: &str, bytes: &[u8]) -> Result<T, CodecError> {
    let (found, body): (&str, &[u8]) = postcard::from_bytes(bytes).context(DecodeSnafu)?;
    ensure!(found == tag, TagMismatchSnafu { expected: tag, found });
    decode(body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        name: String,
        count: u32,
        notes: Option<String>,
    }

    fn sample() -> Widget {
        Widget { name: "anvil".to_string(), count: 3, notes: Some("heavy".to_string()) }
    }

    #[test]
    fn test_roundtrip_primitives() {
        let bytes = encode(&42u64).expect("encode u64");
        let decoded: u64 = decode(&bytes).expect("decode u64");
        assert_eq!(decoded, 42);

        let bytes = encode(&"hello".to_string()).expect("encode string");
        let decoded: String = decode(&bytes).expect("decode string");
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn test_roundtrip_struct() {
        let original = sample();
        let bytes = encode(&original).expect("encode widget");
        let decoded: Widget = decode(&bytes).expect("decode widget");
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_tagged_roundtrip() {
        let original = sample();
        let bytes = encode_tagged("widgets", &original).expect("encode tagged");
        let decoded: Widget = decode_tagged("widgets", &bytes).expect("decode tagged");
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_tagged_mismatch() {
        let bytes = encode_tagged("widgets", &sample()).expect("encode tagged");
        let result: Result<Widget, _> = decode_tagged("gadgets", &bytes);
        let err = result.expect_err("tag mismatch should fail");
        match err {
            CodecError::TagMismatch { expected, found } => {
                assert_eq!(expected, "gadgets");
                assert_eq!(found, "widgets");
            },
            other => panic!("expected TagMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed_input() {
        let malformed = [0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<Widget, _> = decode(&malformed);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_decode_truncated_envelope() {
        let bytes = encode_tagged("widgets", &sample()).expect("encode tagged");
        let truncated = &bytes[..bytes.len() / 2];
        let result: Result<Widget, _> = decode_tagged("widgets", truncated);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_input() {
        let result: Result<u64, _> = decode(&[]);
        assert!(matches!(result, Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;

        let result: Result<Widget, _> = decode(&[0xFF]);
        let err = result.expect_err("should fail");
        assert!(err.source().is_some(), "decode error should carry its source");
    }
}
