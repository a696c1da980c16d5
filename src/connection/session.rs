//! Authenticated session over one transport.
//!
//! A [`Session`] exists only after a successful handshake. It owns the
//! transport, the outbound sender and the router, and is the only way to put
//! a request on the wire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::connection::correlator::{Reply, RequestCorrelator};
use crate::connection::handshake::{Handshake, HandshakeOutcome};
use crate::connection::params::ConnectionParams;
use crate::connection::router::MessageRouter;
use crate::connection::Credentials;
use crate::error::{timeout_ms, ConnectionError, RequestError};
use crate::transport::messages::MessageType;
use crate::transport::{MessageSender, TransportProtocol, WebSocketTransport};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Authenticated, no request outstanding
    Ready,
    /// A request is awaiting its reply
    Busy,
    /// Closed locally or by the server
    Closed,
}

/// Authenticated connection to one database.
pub struct Session {
    params: ConnectionParams,
    transport: Mutex<Box<dyn TransportProtocol>>,
    sender: MessageSender,
    router: Arc<MessageRouter>,
    request_count: AtomicU64,
}

impl Session {
    /// Dial over WebSocket and authenticate.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if the dial fails, the server rejects the
    /// credentials, or dial and handshake together do not finish within the
    /// connection timeout.
    pub async fn connect(params: ConnectionParams) -> Result<Self, ConnectionError> {
        Self::connect_with_transport(params, Box::new(WebSocketTransport::new())).await
    }

    /// Authenticate over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Same as [`Session::connect`].
    pub async fn connect_with_transport(
        params: ConnectionParams,
        mut transport: Box<dyn TransportProtocol>,
    ) -> Result<Self, ConnectionError> {
        let credentials = Credentials::new(params.username.clone(), params.password().to_string());
        let (handshake, outcome) = Handshake::new(params.database.clone(), credentials);
        let router = Arc::new(MessageRouter::new(
            handshake,
            RequestCorrelator::new(params.request_timeout),
        ));

        // One deadline covers the dial and the handshake
        let deadline = Instant::now() + params.connection_timeout;
        let timed_out = || ConnectionError::Timeout {
            timeout_ms: timeout_ms(params.connection_timeout),
        };

        let dial = tokio::time::timeout_at(
            deadline,
            transport.connect(&params.transport_params(), router.clone()),
        )
        .await;
        let sender = match dial {
            Ok(Ok(sender)) => sender,
            Ok(Err(e)) => {
                router.handshake().on_dial_failed();
                return Err(ConnectionError::DialFailed {
                    address: params.address(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                router.handshake().on_dial_failed();
                return Err(timed_out());
            }
        };

        let result = match tokio::time::timeout_at(deadline, outcome).await {
            Ok(Ok(HandshakeOutcome::Authenticated)) => Ok(()),
            Ok(Ok(HandshakeOutcome::Rejected)) => Err(ConnectionError::Rejected {
                database: params.database.clone(),
                username: params.username.clone(),
            }),
            Ok(Ok(HandshakeOutcome::Disconnected(_))) | Ok(Err(_)) => {
                Err(ConnectionError::ConnectionClosed)
            }
            Err(_) => Err(timed_out()),
        };

        if let Err(e) = result {
            router.correlator().close();
            if let Err(close_err) = transport.close().await {
                tracing::debug!(
                    error = %close_err,
                    "error closing transport after failed handshake"
                );
            }
            return Err(e);
        }

        Ok(Self {
            params,
            transport: Mutex::new(transport),
            sender,
            router,
            request_count: AtomicU64::new(0),
        })
    }

    /// Connection parameters.
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        let correlator = self.router.correlator();
        if correlator.is_closed() {
            SessionState::Closed
        } else if correlator.has_pending() {
            SessionState::Busy
        } else {
            SessionState::Ready
        }
    }

    /// Whether requests can still be issued.
    pub fn is_connected(&self) -> bool {
        self.state() != SessionState::Closed && !self.sender.is_closed()
    }

    /// Number of requests that received a reply.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Send one request and wait for its reply.
    ///
    /// A request whose deadline expires leaves the connection unusable: the
    /// transport is shut down and later requests fail with `ConnectionClosed`.
    ///
    /// # Errors
    ///
    /// See [`RequestCorrelator::issue`].
    pub async fn issue(
        &self,
        message_type: MessageType,
        body: impl Into<String>,
    ) -> Result<Reply, RequestError> {
        let reply = self
            .router
            .correlator()
            .issue(&self.sender, message_type, body.into())
            .await;
        match &reply {
            Ok(_) => {
                self.request_count.fetch_add(1, Ordering::SeqCst);
            }
            Err(RequestError::Timeout { .. }) => {
                let mut transport = self.transport.lock().await;
                if let Err(e) = transport.close().await {
                    tracing::debug!(error = %e, "error closing transport after timeout");
                }
            }
            Err(_) => {}
        }
        reply
    }

    /// Close the session and its transport.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::Transport` if the transport fails to shut down.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        self.router.correlator().close();
        let mut transport = self.transport.lock().await;
        transport.close().await?;
        tracing::info!(database = %self.params.database, "connection closed");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("params", &self.params)
            .field("state", &self.state())
            .field("request_count", &self.request_count())
            .finish()
    }
}
