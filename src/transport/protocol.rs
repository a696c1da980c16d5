//! Transport protocol abstraction.
//!
//! A transport is an ordered, message-oriented duplex channel. Outbound traffic
//! goes through a [`MessageSender`]; all inbound traffic is pushed to one
//! registered [`MessageHandler`] with no request/reply correlation of its own.

use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::messages::Message;

/// Parameters for dialing a transport.
#[derive(Debug, Clone)]
pub struct TransportParams {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Use TLS/SSL
    pub use_tls: bool,
    /// Dial timeout in milliseconds
    pub timeout_ms: u64,
}

impl TransportParams {
    /// Create new transport parameters.
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            use_tls: false,
            timeout_ms: 30_000,
        }
    }

    /// Set whether to use TLS.
    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Set dial timeout.
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// `host:port`, with IPv6 hosts bracketed.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Build the WebSocket URL from parameters.
    pub fn to_websocket_url(&self) -> String {
        let scheme = if self.use_tls { "wss" } else { "ws" };
        format!("{}://{}", scheme, self.address())
    }
}

/// Item queued for a transport's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// A message to put on the wire
    Message(Message),
    /// Flush and close the outbound half
    Close,
}

/// Cloneable handle for queueing outbound messages.
///
/// Sending never waits on the network; messages are written in queue order by
/// the transport that owns the receiving half.
#[derive(Debug, Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl MessageSender {
    /// Create a sender and the receiving half a transport drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a message for sending.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::SendError` once the transport has shut down.
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        self.tx.send(Outgoing::Message(message)).map_err(|e| {
            TransportError::SendError(format!("transport is closed ({})", e.0.kind_name()))
        })
    }

    /// Ask the writer to close the outbound half.
    pub fn close(&self) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Close)
            .map_err(|_| TransportError::SendError("transport is closed".to_string()))
    }

    /// Whether the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Outgoing {
    fn kind_name(&self) -> &str {
        match self {
            Outgoing::Message(message) => &message.message_type,
            Outgoing::Close => "close",
        }
    }
}

/// Receiver of every inbound event on one transport.
///
/// Callbacks run on the transport's receive task and must not block.
pub trait MessageHandler: Send + Sync {
    /// Called once after a successful dial, before any message is delivered.
    fn on_connect(&self, sender: &MessageSender);

    /// Called for each inbound message, in arrival order.
    fn on_message(&self, sender: &MessageSender, message: Message);

    /// Called once when the inbound stream ends.
    fn on_disconnect(&self, reason: Option<String>);
}

/// Transport protocol trait for server communication.
#[async_trait]
pub trait TransportProtocol: Send + Sync {
    /// Dial the server and start delivering inbound messages to `handler`.
    ///
    /// # Returns
    ///
    /// The sender for outbound messages.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the server cannot be reached.
    async fn connect(
        &mut self,
        params: &TransportParams,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<MessageSender, TransportError>;

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if shutdown fails.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if the connection is still active.
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::messages::MessageType;

    #[test]
    fn test_transport_params_default() {
        let params = TransportParams::new("localhost".to_string(), 9000);
        assert_eq!(params.host, "localhost");
        assert_eq!(params.port, 9000);
        assert!(!params.use_tls);
        assert_eq!(params.timeout_ms, 30_000);
    }

    #[test]
    fn test_transport_params_builder() {
        let params = TransportParams::new("db.example.com".to_string(), 9000)
            .with_tls(true)
            .with_timeout(5_000);

        assert!(params.use_tls);
        assert_eq!(params.timeout_ms, 5_000);
    }

    #[test]
    fn test_websocket_url() {
        let params = TransportParams::new("localhost".to_string(), 9000);
        assert_eq!(params.to_websocket_url(), "ws://localhost:9000");

        let params = params.with_tls(true);
        assert_eq!(params.to_websocket_url(), "wss://localhost:9000");
    }

    #[test]
    fn test_websocket_url_ipv6() {
        let params = TransportParams::new("::1".to_string(), 9000);
        assert_eq!(params.address(), "[::1]:9000");
        assert_eq!(params.to_websocket_url(), "ws://[::1]:9000");
    }

    #[test]
    fn test_sender_queues_in_order() {
        let (sender, mut rx) = MessageSender::channel();
        sender.send(Message::new(MessageType::Auth, "a")).unwrap();
        sender.close().unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            Outgoing::Message(Message::new(MessageType::Auth, "a"))
        );
        assert_eq!(rx.try_recv().unwrap(), Outgoing::Close);
    }

    #[test]
    fn test_sender_fails_after_receiver_dropped() {
        let (sender, rx) = MessageSender::channel();
        drop(rx);

        assert!(sender.is_closed());
        let result = sender.send(Message::new(MessageType::Insert, "{}"));
        assert!(matches!(result, Err(TransportError::SendError(msg)) if msg.contains("insert")));
    }
}
