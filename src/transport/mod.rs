//! Transport layer for Acorn server communication.
//!
//! # Architecture
//!
//! The transport layer is organized into:
//! - `protocol` - Transport and handler traits, outbound sender
//! - `messages` - Wire message and request body types
//! - `websocket` - WebSocket transport implementation
//!
//! A transport knows nothing about requests and replies. It delivers every
//! inbound message to one [`MessageHandler`]; correlating replies with requests
//! is the job of the connection layer.

pub mod messages;
pub mod protocol;
pub mod websocket;

// Re-export commonly used types
pub use messages::{Message, MessageType};
pub use protocol::{MessageHandler, MessageSender, Outgoing, TransportParams, TransportProtocol};
pub use websocket::WebSocketTransport;
