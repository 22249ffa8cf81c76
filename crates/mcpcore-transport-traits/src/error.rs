//! Transport error types.

use thiserror::Error;

/// A specialized `Result` type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors that can occur establishing, using, or tearing down a transport.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// Failed to establish a connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// An established connection was lost.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Failed to send a message.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Failed to serialize or deserialize a message.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// A frame violated the transport's framing rules (e.g. an embedded
    /// newline in a stdio message).
    #[error("framing error: {0}")]
    FramingError(String),

    /// A message exceeded the configured maximum size.
    #[error("message size ({size} bytes) exceeds maximum allowed ({max} bytes)")]
    MessageTooLarge {
        /// The actual size of the message in bytes.
        size: usize,
        /// The maximum allowed size in bytes.
        max: usize,
    },

    /// No session exists for the supplied session id.
    #[error("no session found for id: {0}")]
    SessionNotFound(String),

    /// An underlying I/O error occurred.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationFailed(err.to_string())
    }
}

/// Validate that a frame does not exceed `max_size`.
pub fn validate_message_size(size: usize, max_size: usize) -> TransportResult<()> {
    if size > max_size {
        return Err(TransportError::MessageTooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_within_limit() {
        assert!(validate_message_size(100, 1024).is_ok());
    }

    #[test]
    fn rejects_over_limit() {
        let err = validate_message_size(2048, 1024).unwrap_err();
        matches!(err, TransportError::MessageTooLarge { .. });
    }
}
