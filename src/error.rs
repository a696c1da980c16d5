//! Error types for acorn-store-rs.
//!
//! Errors are grouped by where they arise: establishing a connection, running a
//! request against an authenticated connection, and the transport underneath.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum AcornError {
    /// Connection-related errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Request errors
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Transport errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while connecting to or closing a database.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The transport could not reach the server.
    #[error("Failed to connect to {address}: {message}")]
    DialFailed { address: String, message: String },

    /// The server refused the credentials.
    #[error("Connection rejected by the server for user '{username}' on database '{database}'")]
    Rejected { database: String, username: String },

    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string parsing error
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),

    /// No terminal handshake message arrived in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is closed
    #[error("Connection is closed")]
    ConnectionClosed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors returned by operations on an authenticated connection.
#[derive(Error, Debug)]
pub enum RequestError {
    /// Another request on the same connection has not been answered yet.
    #[error("A '{pending}' request is still awaiting its reply on this connection")]
    RequestInFlight { pending: String },

    /// The reply did not arrive before the request deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection was closed before or while the request was pending.
    #[error("Connection is closed")]
    ConnectionClosed,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request body could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The server answered with something that is not JSON.
    #[error("Server returned invalid JSON '{raw}'")]
    InvalidJson { raw: String },

    #[error("Failed to create collection '{collection}' in database '{database}'")]
    CreateCollectionFailed { collection: String, database: String },

    #[error("Failed to delete collection '{collection}' in database '{database}'")]
    DeleteCollectionFailed { collection: String, database: String },

    #[error("Failed to insert '{document}' into '{collection}'")]
    InsertFailed { document: String, collection: String },

    #[error("Failed to update '{path}' in '{collection}' with the new value '{value}'")]
    UpdateFailed {
        path: String,
        collection: String,
        value: String,
    },

    #[error("Failed to delete documents in '{collection}' on condition '{condition}'")]
    DeleteFailed {
        collection: String,
        condition: String,
    },
}

impl RequestError {
    /// The raw reply text carried by a malformed-reply error.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            RequestError::InvalidJson { raw } => Some(raw),
            _ => None,
        }
    }
}

/// Errors related to the message transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Message serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Message deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    IoError(String),

    /// Message send error
    #[error("Failed to send message: {0}")]
    SendError(String),
}

/// Coarse classification of failures, for callers that branch on the kind of
/// problem rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server could not be reached
    Dial,
    /// Authentication was refused
    Rejected,
    /// Bad connection string or parameter
    InvalidArgument,
    /// A deadline expired
    Timeout,
    /// The connection is gone
    Closed,
    /// A request was issued while another was outstanding
    Busy,
    /// The server reply was not valid JSON
    MalformedReply,
    /// The server did not confirm the operation
    OperationFailed,
    /// Transport-level failure
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Dial => write!(f, "DIAL"),
            ErrorKind::Rejected => write!(f, "REJECTED"),
            ErrorKind::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorKind::Timeout => write!(f, "TIMEOUT"),
            ErrorKind::Closed => write!(f, "CLOSED"),
            ErrorKind::Busy => write!(f, "BUSY"),
            ErrorKind::MalformedReply => write!(f, "MALFORMED_REPLY"),
            ErrorKind::OperationFailed => write!(f, "OPERATION_FAILED"),
            ErrorKind::Transport => write!(f, "TRANSPORT"),
        }
    }
}

impl AcornError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcornError::Connection(e) => e.kind(),
            AcornError::Request(e) => e.kind(),
            AcornError::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl ConnectionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::DialFailed { .. } => ErrorKind::Dial,
            ConnectionError::Rejected { .. } => ErrorKind::Rejected,
            ConnectionError::InvalidParameter { .. } | ConnectionError::ParseError(_) => {
                ErrorKind::InvalidArgument
            }
            ConnectionError::Timeout { .. } => ErrorKind::Timeout,
            ConnectionError::ConnectionClosed => ErrorKind::Closed,
            ConnectionError::Transport(_) => ErrorKind::Transport,
        }
    }
}

impl RequestError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RequestError::RequestInFlight { .. } => ErrorKind::Busy,
            RequestError::Timeout { .. } => ErrorKind::Timeout,
            RequestError::ConnectionClosed => ErrorKind::Closed,
            RequestError::Transport(_) => ErrorKind::Transport,
            RequestError::Serialization(_) => ErrorKind::InvalidArgument,
            RequestError::InvalidJson { .. } => ErrorKind::MalformedReply,
            RequestError::CreateCollectionFailed { .. }
            | RequestError::DeleteCollectionFailed { .. }
            | RequestError::InsertFailed { .. }
            | RequestError::UpdateFailed { .. }
            | RequestError::DeleteFailed { .. } => ErrorKind::OperationFailed,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Serialization(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocketError(err.to_string())
    }
}

/// Milliseconds for a timeout error, saturating at `u64::MAX`.
pub(crate) fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_ms_saturates() {
        assert_eq!(timeout_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(timeout_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_dial_failed_display() {
        let err = ConnectionError::DialFailed {
            address: "127.0.0.1:9000".to_string(),
            message: "Connection refused".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:9000"));
        assert!(err.to_string().contains("Connection refused"));
        assert_eq!(err.kind(), ErrorKind::Dial);
    }

    #[test]
    fn test_rejected_is_distinct_from_dial() {
        let err = ConnectionError::Rejected {
            database: "mydb".to_string(),
            username: "alice".to_string(),
        };
        assert!(err.to_string().contains("rejected"));
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_ne!(err.kind(), ErrorKind::Dial);
    }

    #[test]
    fn test_insert_failed_names_document_and_collection() {
        let err = RequestError::InsertFailed {
            document: "{\"a\":1}".to_string(),
            collection: "people".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("{\"a\":1}"));
        assert!(msg.contains("people"));
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
    }

    #[test]
    fn test_invalid_json_exposes_raw_reply() {
        let err = RequestError::InvalidJson {
            raw: "not json".to_string(),
        };
        assert!(err.to_string().contains("invalid JSON"));
        assert_eq!(err.raw_reply(), Some("not json"));
        assert_eq!(err.kind(), ErrorKind::MalformedReply);

        assert!(RequestError::ConnectionClosed.raw_reply().is_none());
    }

    #[test]
    fn test_error_kind_mapping() {
        let err = AcornError::Connection(ConnectionError::Timeout { timeout_ms: 5000 });
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = AcornError::Request(RequestError::RequestInFlight {
            pending: "insert".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Busy);

        let err = AcornError::Transport(TransportError::SendError("closed".to_string()));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Rejected.to_string(), "REJECTED");
        assert_eq!(ErrorKind::MalformedReply.to_string(), "MALFORMED_REPLY");
    }
}
