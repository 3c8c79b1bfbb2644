//! Codec error types.

use crate::kind::BinaryKind;
use thiserror::Error;

/// Errors raised while splitting a message into wire parts.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("non-finite float at {path} cannot be represented in the envelope")]
    NonFiniteFloat { path: String },

    #[error("map at {path} uses the reserved placeholder key")]
    ReservedKey { path: String },

    #[error("message nesting exceeds maximum depth of {max}")]
    DepthExceeded { max: usize },

    #[error("message carries more than {max} binary payloads")]
    TooManyBinaries { max: usize },

    #[error("binary payload at {path} has no plain JSON form")]
    BinaryInPlainJson { path: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while reassembling a message from wire parts.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("placeholder index {index} out of bounds ({count} binaries)")]
    IndexOutOfBounds { index: u64, count: usize },

    #[error("unknown binary kind tag: {0:?}")]
    UnknownKind(String),

    #[error("malformed placeholder: {0}")]
    MalformedPlaceholder(&'static str),

    #[error("{kind} placeholder of length {length} does not match {byte_len} byte block")]
    LengthMismatch {
        kind: BinaryKind,
        length: u64,
        byte_len: usize,
    },

    #[error("{count} binaries supplied (max {max})")]
    TooManyBinaries { count: usize, max: usize },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::NonFiniteFloat {
            path: "$.bar".to_string(),
        };
        assert!(err.to_string().contains("$.bar"));

        let err = EncodeError::DepthExceeded { max: 100 };
        assert!(err.to_string().contains("100"));

        let err = EncodeError::TooManyBinaries { max: 4 };
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::IndexOutOfBounds { index: 7, count: 2 };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('2'));

        let err = DecodeError::UnknownKind("float16".to_string());
        assert!(err.to_string().contains("float16"));

        let err = DecodeError::LengthMismatch {
            kind: BinaryKind::Float32,
            length: 3,
            byte_len: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("float32"));
        assert!(msg.contains("10"));

        let err = DecodeError::MissingField("id");
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: DecodeError = json_err.into();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(err.to_string().starts_with("malformed envelope"));
    }
}
