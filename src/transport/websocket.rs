//! WebSocket transport implementation.
//!
//! Each [`Message`] travels as one text frame containing its JSON encoding.
//! A writer task drains the [`MessageSender`] queue and a reader task feeds
//! decoded frames to the registered handler.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as Frame};

use crate::error::TransportError;

use super::messages::Message;
use super::protocol::{MessageHandler, MessageSender, Outgoing, TransportParams, TransportProtocol};

/// WebSocket transport implementation.
pub struct WebSocketTransport {
    /// Outbound queue (None if not connected)
    sender: Option<MessageSender>,
    /// Task writing queued messages to the socket
    writer: Option<JoinHandle<()>>,
    /// Task reading frames and dispatching them
    reader: Option<JoinHandle<()>>,
    /// Connection state
    state: ConnectionState,
}

/// Connection state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Socket open
    Connected,
    /// Connection closed
    Closed,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        Self {
            sender: None,
            writer: None,
            reader: None,
            state: ConnectionState::Disconnected,
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

// Dropping the tasks drops both halves of the stream, which closes the socket
impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Decode one inbound frame. `Ok(None)` for frames that carry no message.
fn decode_frame(frame: Frame) -> Result<Option<Message>, TransportError> {
    match frame {
        Frame::Text(text) => Message::from_json(&text).map(Some),
        Frame::Binary(bytes) => {
            let text = std::str::from_utf8(&bytes)
                .map_err(|e| TransportError::DeserializationError(e.to_string()))?;
            Message::from_json(text).map(Some)
        }
        _ => Ok(None),
    }
}

#[async_trait]
impl TransportProtocol for WebSocketTransport {
    async fn connect(
        &mut self,
        params: &TransportParams,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<MessageSender, TransportError> {
        if self.state != ConnectionState::Disconnected {
            return Err(TransportError::ProtocolError(
                "Already connected".to_string(),
            ));
        }

        let url = params.to_websocket_url();
        tracing::debug!(url = %url, "dialing");

        let (ws_stream, _) = tokio::time::timeout(
            tokio::time::Duration::from_millis(params.timeout_ms),
            connect_async(url.as_str()),
        )
        .await
        .map_err(|_| {
            TransportError::IoError(format!("Connection timeout after {}ms", params.timeout_ms))
        })?
        .map_err(|e| TransportError::WebSocketError(e.to_string()))?;

        let (mut sink, mut stream) = ws_stream.split();
        let (sender, mut outgoing) = MessageSender::channel();

        // Must run before the reader starts so the handler sees the dial first.
        handler.on_connect(&sender);

        let writer = tokio::spawn(async move {
            while let Some(item) = outgoing.recv().await {
                match item {
                    Outgoing::Message(message) => {
                        let text = match message.to_json() {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::warn!(error = %e, "dropping unencodable message");
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Frame::Text(text)).await {
                            tracing::warn!(error = %e, "websocket write failed");
                            break;
                        }
                    }
                    Outgoing::Close => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
        });

        let reader_sender = sender.clone();
        let reader = tokio::spawn(async move {
            let mut reason = None;
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Frame::Close(close)) => {
                        reason = close.map(|c| c.reason.to_string());
                        break;
                    }
                    Ok(frame) => match decode_frame(frame) {
                        Ok(Some(message)) => handler.on_message(&reader_sender, message),
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "skipping undecodable frame"),
                    },
                    Err(e) => {
                        reason = Some(e.to_string());
                        break;
                    }
                }
            }
            handler.on_disconnect(reason);
        });

        self.sender = Some(sender.clone());
        self.writer = Some(writer);
        self.reader = Some(reader);
        self.state = ConnectionState::Connected;

        Ok(sender)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.state != ConnectionState::Connected {
            return Ok(());
        }

        if let Some(sender) = self.sender.take() {
            // Writer may already be gone if the socket failed
            let _ = sender.close();
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }

        self.state = ConnectionState::Closed;
        tracing::debug!("websocket transport closed");

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
            && self
                .reader
                .as_ref()
                .map(|reader| !reader.is_finished())
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::messages::MessageType;

    struct NullHandler;

    impl MessageHandler for NullHandler {
        fn on_connect(&self, _sender: &MessageSender) {}
        fn on_message(&self, _sender: &MessageSender, _message: Message) {}
        fn on_disconnect(&self, _reason: Option<String>) {}
    }

    #[test]
    fn test_websocket_transport_new() {
        let transport = WebSocketTransport::new();
        assert!(!transport.is_connected());
        assert_eq!(transport.state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_websocket_transport_default() {
        let transport = WebSocketTransport::default();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_requires_disconnected_state() {
        let mut transport = WebSocketTransport::new();
        transport.state = ConnectionState::Closed;

        let params = TransportParams::new("localhost".to_string(), 9000);
        let result = transport.connect(&params, Arc::new(NullHandler)).await;

        assert!(result.is_err());
        if let Err(TransportError::ProtocolError(msg)) = result {
            assert!(msg.contains("Already connected"));
        } else {
            panic!("Expected ProtocolError");
        }
    }

    #[tokio::test]
    async fn test_close_idempotent() {
        let mut transport = WebSocketTransport::new();

        let result = transport.close().await;
        assert!(result.is_ok());
        assert_eq!(transport.state, ConnectionState::Disconnected);

        transport.state = ConnectionState::Closed;
        let result = transport.close().await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_decode_text_frame() {
        let frame = Frame::Text(r#"{"type":"response","body":"insert success"}"#.to_string());
        let message = decode_frame(frame).unwrap().unwrap();
        assert_eq!(message.kind(), Some(MessageType::Response));
        assert_eq!(message.body, "insert success");
    }

    #[test]
    fn test_decode_control_frame() {
        assert!(decode_frame(Frame::Ping(vec![1])).unwrap().is_none());
    }

    #[test]
    fn test_decode_garbage_frame() {
        assert!(decode_frame(Frame::Text("garbage".to_string())).is_err());
    }
}
