//! Wire message types for the Acorn protocol.
//!
//! Every frame exchanged with the server is a [`Message`]: a type tag plus a
//! string body. Request bodies for document operations are JSON objects whose
//! field names are fixed by the server.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransportError;

/// Reply body confirming a document insert.
pub const INSERT_SUCCESS: &str = "insert success";
/// Reply body confirming a document update.
pub const UPDATE_SUCCESS: &str = "update success";
/// Reply body confirming a document delete.
pub const DELETE_SUCCESS: &str = "delete success";
/// Reply body confirming collection creation.
pub const CREATE_COLLECTION_SUCCESS: &str = "create collection success";
/// Reply body confirming collection deletion.
pub const DELETE_COLLECTION_SUCCESS: &str = "delete collection success";

/// Known message type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    AuthRequest,
    Auth,
    Connected,
    Rejected,
    Retrieve,
    Insert,
    Update,
    Delete,
    Collections,
    UserGrants,
    CreateCollection,
    DeleteCollection,
    Response,
    ServerErrorResponse,
}

impl MessageType {
    /// All tags, in protocol order.
    pub const ALL: [MessageType; 14] = [
        MessageType::AuthRequest,
        MessageType::Auth,
        MessageType::Connected,
        MessageType::Rejected,
        MessageType::Retrieve,
        MessageType::Insert,
        MessageType::Update,
        MessageType::Delete,
        MessageType::Collections,
        MessageType::UserGrants,
        MessageType::CreateCollection,
        MessageType::DeleteCollection,
        MessageType::Response,
        MessageType::ServerErrorResponse,
    ];

    /// The exact tag string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::AuthRequest => "auth request",
            MessageType::Auth => "auth",
            MessageType::Connected => "connected",
            MessageType::Rejected => "rejected",
            MessageType::Retrieve => "retrieve",
            MessageType::Insert => "insert",
            MessageType::Update => "update",
            MessageType::Delete => "delete",
            MessageType::Collections => "collections",
            MessageType::UserGrants => "user grants",
            MessageType::CreateCollection => "create collection",
            MessageType::DeleteCollection => "delete collection",
            MessageType::Response => "response",
            MessageType::ServerErrorResponse => "server error response",
        }
    }

    /// Look up a tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single framed message.
///
/// The tag is kept as a raw string so that messages with tags this client
/// does not know can still be decoded and then ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Type tag
    #[serde(rename = "type")]
    pub message_type: String,
    /// Payload
    #[serde(default)]
    pub body: String,
}

impl Message {
    /// Create a message with a known tag.
    pub fn new(message_type: MessageType, body: impl Into<String>) -> Self {
        Self {
            message_type: message_type.as_str().to_string(),
            body: body.into(),
        }
    }

    /// Create a message with an arbitrary tag.
    pub fn with_tag(tag: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_type: tag.into(),
            body: body.into(),
        }
    }

    /// The parsed tag, if known.
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::from_tag(&self.message_type)
    }

    /// Encode as a JSON text frame.
    pub fn to_json(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a JSON text frame.
    pub fn from_json(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text).map_err(|e| TransportError::DeserializationError(e.to_string()))
    }
}

/// Body of a `retrieve` request.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieveRequest<'a> {
    pub collection_name: &'a str,
    pub condition: &'a str,
}

/// Body of an `insert` request.
#[derive(Debug, Clone, Serialize)]
pub struct InsertRequest<'a> {
    pub collection_name: &'a str,
    pub document: &'a str,
}

/// Body of an `update` request.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateRequest<'a> {
    pub collection_name: &'a str,
    pub condition: &'a str,
    pub path: &'a str,
    pub value: &'a str,
}

/// Body of a `delete` request.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteRequest<'a> {
    pub collection_name: &'a str,
    pub condition: &'a str,
}
