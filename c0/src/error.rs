//! Client error types

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a queue transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("Connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("No reply from {addr} to {command} within {timeout:?}")]
    ReplyTimeout {
        addr: String,
        command: &'static str,
        timeout: Duration,
    },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Transport closed")]
    Closed,
}

/// A payload read from a result channel could not be decoded
#[derive(Debug, Error)]
#[error("Malformed payload on {channel}: {source}")]
pub struct DecodeError {
    pub channel: String,
    #[source]
    pub source: serde_json::Error,
}

/// Errors surfaced to callers of the client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to {operation}: {message}")]
    Operation { operation: String, message: String },

    #[error("Failed to dispatch command to {target}: {message}")]
    Dispatch { target: String, message: String },

    #[error("No result for {operation} within {timeout:?}")]
    NoResult { operation: String, timeout: Duration },

    #[error("Failed to encode arguments: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// Check if this error came from the queue transport
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// Check if this error is a malformed result payload
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }

    /// Build an operation error from an executor's diagnostic text
    pub fn operation(operation: impl Into<String>, message: Option<&str>) -> Self {
        ClientError::Operation {
            operation: operation.into(),
            message: message.unwrap_or_default().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_message_echoes_diagnostic() {
        let err = ClientError::operation("create container", Some("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("create container"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_operation_without_data() {
        let err = ClientError::operation("list bridges", None);
        assert_eq!(err.to_string(), "Failed to list bridges: ");
    }

    #[test]
    fn test_dispatch_message() {
        let err = ClientError::Dispatch {
            target: "container-1".to_string(),
            message: "no such container".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("container-1"));
        assert!(msg.contains("no such container"));
    }

    #[test]
    fn test_decode_error_classification() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ClientError = DecodeError {
            channel: "result:abc".to_string(),
            source,
        }
        .into();
        assert!(err.is_decode());
        assert!(!err.is_transport());
        assert!(err.to_string().contains("result:abc"));
    }

    #[test]
    fn test_transport_error_classification() {
        let err: ClientError = TransportError::Closed.into();
        assert!(err.is_transport());
        assert!(!err.is_decode());
    }
}
