//! Connection handshake state machine.
//!
//! ```text
//! Dialing -> AwaitingAuthChallenge -> AuthSent -> Authenticated
//!                                         \----> Rejected
//! ```
//!
//! The handshake is driven entirely by inbound messages on the same channel
//! that later carries request replies. Its outcome is delivered exactly once
//! through a oneshot channel to the task waiting in `connect`.

use std::sync::{Mutex, PoisonError};
use tokio::sync::oneshot;

use crate::connection::auth::{AuthRequest, Credentials};
use crate::transport::messages::{Message, MessageType};
use crate::transport::MessageSender;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Transport dial in progress
    Dialing,
    /// Dialed, waiting for the server's `auth request`
    AwaitingAuthChallenge,
    /// `auth` sent, waiting for the verdict
    AuthSent,
    /// Server accepted the credentials
    Authenticated,
    /// Server refused the credentials
    Rejected,
    /// Dial failed or the transport went away mid-handshake
    Failed,
}

impl HandshakeState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandshakeState::Authenticated | HandshakeState::Rejected | HandshakeState::Failed
        )
    }
}

/// Terminal result handed to the connecting task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Authenticated,
    Rejected,
    Disconnected(Option<String>),
}

struct Inner {
    state: HandshakeState,
    completion: Option<oneshot::Sender<HandshakeOutcome>>,
}

/// Authentication exchange for one connection.
pub struct Handshake {
    database: String,
    credentials: Credentials,
    inner: Mutex<Inner>,
}

impl Handshake {
    /// Create a handshake and the receiver its outcome is delivered on.
    pub fn new(
        database: String,
        credentials: Credentials,
    ) -> (Self, oneshot::Receiver<HandshakeOutcome>) {
        let (tx, rx) = oneshot::channel();
        let handshake = Self {
            database,
            credentials,
            inner: Mutex::new(Inner {
                state: HandshakeState::Dialing,
                completion: Some(tx),
            }),
        };
        (handshake, rx)
    }

    /// Current state.
    pub fn state(&self) -> HandshakeState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The transport is up; wait for the challenge.
    pub fn on_dialed(&self) {
        let mut inner = self.lock();
        if inner.state == HandshakeState::Dialing {
            inner.state = HandshakeState::AwaitingAuthChallenge;
        }
    }

    /// The dial itself failed. The connecting task reports the dial error.
    pub fn on_dial_failed(&self) {
        let mut inner = self.lock();
        if !inner.state.is_terminal() {
            inner.state = HandshakeState::Failed;
            inner.completion = None;
        }
    }

    /// Server challenge: answer with the credentials.
    pub fn on_auth_request(&self, sender: &MessageSender) {
        let mut inner = self.lock();
        if inner.state != HandshakeState::AwaitingAuthChallenge {
            tracing::warn!(state = ?inner.state, "ignoring unexpected auth request");
            return;
        }

        let body = match AuthRequest::new(&self.database, &self.credentials).to_body() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode auth message");
                Self::finish(
                    &mut inner,
                    HandshakeState::Failed,
                    HandshakeOutcome::Disconnected(Some(e.to_string())),
                );
                return;
            }
        };

        match sender.send(Message::new(MessageType::Auth, body)) {
            Ok(()) => {
                tracing::debug!(
                    database = %self.database,
                    user = %self.credentials.username(),
                    "auth sent"
                );
                inner.state = HandshakeState::AuthSent;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to send auth message");
                Self::finish(
                    &mut inner,
                    HandshakeState::Failed,
                    HandshakeOutcome::Disconnected(Some(e.to_string())),
                );
            }
        }
    }

    /// Server accepted the credentials.
    pub fn on_connected(&self) {
        let mut inner = self.lock();
        if inner.state != HandshakeState::AuthSent {
            tracing::warn!(state = ?inner.state, "ignoring unexpected 'connected'");
            return;
        }
        tracing::info!(
            database = %self.database,
            user = %self.credentials.username(),
            "authenticated"
        );
        Self::finish(
            &mut inner,
            HandshakeState::Authenticated,
            HandshakeOutcome::Authenticated,
        );
    }

    /// Server refused the credentials. Honoured from any non-terminal state.
    pub fn on_rejected(&self) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            tracing::warn!(state = ?inner.state, "ignoring unexpected 'rejected'");
            return;
        }
        tracing::warn!(
            database = %self.database,
            user = %self.credentials.username(),
            "connection rejected by the server"
        );
        Self::finish(&mut inner, HandshakeState::Rejected, HandshakeOutcome::Rejected);
    }

    /// The inbound stream ended.
    pub fn on_disconnect(&self, reason: Option<String>) {
        let mut inner = self.lock();
        if !inner.state.is_terminal() {
            Self::finish(
                &mut inner,
                HandshakeState::Failed,
                HandshakeOutcome::Disconnected(reason),
            );
        }
    }

    fn finish(inner: &mut Inner, state: HandshakeState, outcome: HandshakeOutcome) {
        inner.state = state;
        if let Some(tx) = inner.completion.take() {
            // Receiver gone means connect already gave up (timeout)
            let _ = tx.send(outcome);
        }
    }
}
