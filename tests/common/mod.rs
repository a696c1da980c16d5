//! Common test utilities for acorn-store-rs integration tests.
//!
//! Tests run against [`MockTransport`], an in-memory transport whose server
//! side ([`MockServer`]) is scripted by the test. Messages queued with
//! [`MockServer::push`] are delivered at once; replies queued with
//! [`MockServer::reply`] are delivered one per request, right after the
//! request is written. Requests the client put on the wire are read back with
//! [`MockServer::next_request`].
//!
//! Set `RUST_LOG=acorn_store_rs=debug` to see the client's tracing output.

#![allow(dead_code)]

use acorn_store_rs::transport::{
    Message, MessageHandler, MessageSender, Outgoing, TransportParams, TransportProtocol,
};
use acorn_store_rs::{ConnectionBuilder, ConnectionParams, Database, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ============================================================================
// Configuration
// ============================================================================

pub const HOST: &str = "127.0.0.1";
pub const PORT: u16 = 9000;
pub const DATABASE: &str = "mydb";
pub const USER: &str = "alice";
pub const PASSWORD: &str = "secret";

/// How long a test waits for the client to send something.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Install a tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Parameters pointing at the mock server.
pub fn test_params() -> ConnectionParams {
    params_builder()
        .build()
        .expect("test parameters should be valid")
}

/// Builder preloaded with the mock server's address and credentials.
pub fn params_builder() -> ConnectionBuilder {
    ConnectionBuilder::new()
        .host(HOST)
        .port(PORT)
        .database(DATABASE)
        .username(USER)
        .password(PASSWORD)
}

// ============================================================================
// Mock transport
// ============================================================================

/// In-memory transport driven by a [`MockServer`].
pub struct MockTransport {
    inbound: Option<mpsc::UnboundedReceiver<Message>>,
    /// Weak so that dropping the server's sender ends the receive loop
    inbound_tx: mpsc::WeakUnboundedSender<Message>,
    script: Arc<Mutex<VecDeque<Message>>>,
    requests: mpsc::UnboundedSender<Message>,
    fail_dial: bool,
    dial_delay: Option<Duration>,
    sender: Option<MessageSender>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

/// Test-side end of a [`MockTransport`].
pub struct MockServer {
    inbound: Option<mpsc::UnboundedSender<Message>>,
    script: Arc<Mutex<VecDeque<Message>>>,
    requests: mpsc::UnboundedReceiver<Message>,
}

impl MockTransport {
    /// A connected transport/server pair.
    pub fn pair() -> (Self, MockServer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let script = Arc::new(Mutex::new(VecDeque::new()));

        let transport = Self {
            inbound: Some(inbound_rx),
            inbound_tx: inbound_tx.downgrade(),
            script: Arc::clone(&script),
            requests: requests_tx,
            fail_dial: false,
            dial_delay: None,
            sender: None,
            writer: None,
            reader: None,
        };
        let server = MockServer {
            inbound: Some(inbound_tx),
            script,
            requests: requests_rx,
        };
        (transport, server)
    }

    /// A transport whose dial always fails.
    pub fn unreachable() -> Self {
        let (mut transport, _server) = Self::pair();
        transport.fail_dial = true;
        transport
    }

    /// Make the dial take `delay` before it succeeds.
    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }
}

#[async_trait]
impl TransportProtocol for MockTransport {
    async fn connect(
        &mut self,
        params: &TransportParams,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<MessageSender, TransportError> {
        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_dial {
            return Err(TransportError::IoError(format!(
                "connection refused by {}",
                params.address()
            )));
        }
        let mut inbound = self
            .inbound
            .take()
            .ok_or_else(|| TransportError::ProtocolError("Already connected".to_string()))?;

        let (sender, mut outgoing) = MessageSender::channel();
        handler.on_connect(&sender);

        let requests = self.requests.clone();
        let inbound_tx = self.inbound_tx.clone();
        let script = Arc::clone(&self.script);
        let writer = tokio::spawn(async move {
            while let Some(item) = outgoing.recv().await {
                match item {
                    Outgoing::Message(message) => {
                        if requests.send(message).is_err() {
                            break;
                        }
                        let reply = script.lock().unwrap().pop_front();
                        if let (Some(reply), Some(tx)) = (reply, inbound_tx.upgrade()) {
                            let _ = tx.send(reply);
                        }
                    }
                    Outgoing::Close => break,
                }
            }
        });

        let reader_sender = sender.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                handler.on_message(&reader_sender, message);
            }
            handler.on_disconnect(Some("server went away".to_string()));
        });

        self.sender = Some(sender.clone());
        self.writer = Some(writer);
        self.reader = Some(reader);
        Ok(sender)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(sender) = self.sender.take() {
            let _ = sender.close();
        }
        if let Some(writer) = self.writer.take() {
            let _ = writer.await;
        }
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.reader
            .as_ref()
            .map(|reader| !reader.is_finished())
            .unwrap_or(false)
    }
}

impl MockServer {
    /// Queue an inbound message for the client.
    pub fn push(&self, tag: &str, body: &str) {
        self.inbound
            .as_ref()
            .expect("server already disconnected")
            .send(Message::with_tag(tag, body))
            .expect("client transport is gone");
    }

    /// Script the message that answers the next unanswered request.
    pub fn reply(&self, tag: &str, body: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Message::with_tag(tag, body));
    }

    /// Script a `response` to the next unanswered request.
    pub fn respond(&self, body: &str) {
        self.reply("response", body);
    }

    /// Script a successful handshake: challenge, then acceptance of `auth`.
    pub fn accept(&self) {
        self.push("auth request", "");
        self.reply("connected", "");
    }

    /// Script a rejected handshake.
    pub fn reject(&self) {
        self.push("auth request", "");
        self.reply("rejected", "");
    }

    /// Next message the client sent.
    pub async fn next_request(&mut self) -> Message {
        tokio::time::timeout(RECV_TIMEOUT, self.requests.recv())
            .await
            .expect("client sent nothing in time")
            .expect("client transport is gone")
    }

    /// Fail if the client has sent anything not yet read.
    pub fn assert_idle(&mut self) {
        if let Ok(message) = self.requests.try_recv() {
            panic!("unexpected request {:?}", message);
        }
    }

    /// Drop the inbound side, ending the client's receive loop.
    pub fn disconnect(&mut self) {
        self.inbound = None;
    }
}

/// Connect a [`Database`] through a fresh mock pair that accepts the login.
///
/// The `auth` message is consumed from the server's queue.
pub async fn connected_database() -> (Database, MockServer) {
    connected_database_with(test_params()).await
}

/// Like [`connected_database`] with custom parameters.
pub async fn connected_database_with(params: ConnectionParams) -> (Database, MockServer) {
    init_tracing();
    let (transport, mut server) = MockTransport::pair();
    server.accept();

    let db = Database::connect_with_transport(params, Box::new(transport))
        .await
        .expect("handshake should succeed");

    let auth = server.next_request().await;
    assert_eq!(auth.message_type, "auth");
    (db, server)
}
