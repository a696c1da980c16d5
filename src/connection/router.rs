//! Inbound message dispatch.
//!
//! The router is the single [`MessageHandler`] registered with a transport. It
//! classifies each message by tag and hands it to the handshake or the request
//! correlator. Unknown tags are dropped.

use crate::connection::correlator::{Reply, RequestCorrelator};
use crate::connection::handshake::Handshake;
use crate::transport::messages::{Message, MessageType};
use crate::transport::{MessageHandler, MessageSender};

/// Routes inbound messages for one connection.
pub struct MessageRouter {
    handshake: Handshake,
    correlator: RequestCorrelator,
}

impl MessageRouter {
    pub fn new(handshake: Handshake, correlator: RequestCorrelator) -> Self {
        Self {
            handshake,
            correlator,
        }
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn correlator(&self) -> &RequestCorrelator {
        &self.correlator
    }
}

impl MessageHandler for MessageRouter {
    fn on_connect(&self, _sender: &MessageSender) {
        self.handshake.on_dialed();
    }

    fn on_message(&self, sender: &MessageSender, message: Message) {
        tracing::debug!(
            message_type = %message.message_type,
            body_len = message.body.len(),
            "inbound message"
        );

        match message.kind() {
            Some(MessageType::AuthRequest) => self.handshake.on_auth_request(sender),
            Some(MessageType::Connected) => self.handshake.on_connected(),
            Some(MessageType::Rejected) => self.handshake.on_rejected(),
            Some(MessageType::Response) => self.correlator.complete(Reply::response(message.body)),
            Some(MessageType::ServerErrorResponse) => {
                tracing::warn!(body = %message.body, "server error response");
                self.correlator.complete(Reply::server_error());
            }
            _ => tracing::debug!(message_type = %message.message_type, "ignoring message"),
        }
    }

    fn on_disconnect(&self, reason: Option<String>) {
        tracing::info!(reason = reason.as_deref().unwrap_or("none"), "transport disconnected");
        self.handshake.on_disconnect(reason);
        self.correlator.close();
    }
}
