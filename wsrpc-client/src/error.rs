//! Client error types.

use thiserror::Error;
use wsrpc_protocol::{DecodeError, EncodeError, RequestId};

/// Pending table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PendingError {
    #[error("request id {0} is already pending")]
    DuplicateId(RequestId),

    #[error("no pending request for id {0}")]
    NotFound(RequestId),

    #[error("request id space exhausted")]
    IdsExhausted,
}

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("correlation error: {0}")]
    Pending(#[from] PendingError),
}

impl ClientError {
    /// Returns whether this error reports a reply nobody is waiting for
    /// (already resolved, cancelled, or never issued).
    pub fn is_stale_reply(&self) -> bool {
        matches!(self, ClientError::Pending(PendingError::NotFound(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_error_display() {
        let err = PendingError::DuplicateId(RequestId(5));
        assert_eq!(err.to_string(), "request id 5 is already pending");

        let err = PendingError::NotFound(RequestId(9));
        assert_eq!(err.to_string(), "no pending request for id 9");

        let err = PendingError::IdsExhausted;
        assert_eq!(err.to_string(), "request id space exhausted");
    }

    #[test]
    fn test_stale_reply() {
        let err: ClientError = PendingError::NotFound(RequestId(1)).into();
        assert!(err.is_stale_reply());

        let err: ClientError = PendingError::DuplicateId(RequestId(1)).into();
        assert!(!err.is_stale_reply());

        let err: ClientError = DecodeError::MissingField("id").into();
        assert!(!err.is_stale_reply());
        assert!(err.to_string().contains("id"));
    }
}
