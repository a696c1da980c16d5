//! Single-outstanding-request correlation.
//!
//! The transport carries no request identifiers, so a reply is matched to a
//! request purely by order: at most one request may be pending per connection,
//! and the next `response` / `server error response` to arrive completes it.
//!
//! Each request gets its own oneshot channel. The slot holding its sender is
//! the only shared state between the receive task (which completes it) and
//! the caller (which awaits it).
//!
//! A request that was sent but whose caller stopped waiting (deadline expired
//! or future dropped) leaves its reply owed with nothing to tell it apart from
//! the next one. The correlator closes at that point; later requests fail with
//! `ConnectionClosed` instead of timing out one after another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{timeout_ms, RequestError};
use crate::transport::messages::{Message, MessageType};
use crate::transport::MessageSender;

/// Body of the inbound message that completed a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    body: String,
    server_error: bool,
}

impl Reply {
    /// A normal `response`.
    pub fn response(body: String) -> Self {
        Self {
            body,
            server_error: false,
        }
    }

    /// A `server error response`. The error text is logged, not kept.
    pub fn server_error() -> Self {
        Self {
            body: String::new(),
            server_error: true,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    /// Whether the server answered with an error notice.
    pub fn is_server_error(&self) -> bool {
        self.server_error
    }
}

struct PendingRequest {
    id: u64,
    message_type: MessageType,
    reply_tx: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingRequest>,
    closed: bool,
}

/// Enforces at most one outstanding request and pairs it with its reply.
pub struct RequestCorrelator {
    slot: Mutex<Slot>,
    next_id: AtomicU64,
    request_timeout: Option<Duration>,
}

impl RequestCorrelator {
    /// Create a correlator. `request_timeout` of `None` waits indefinitely.
    pub fn new(request_timeout: Option<Duration>) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            next_id: AtomicU64::new(1),
            request_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request is awaiting its reply.
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Whether the correlator has been shut down.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Send one request and wait for the reply that follows it.
    ///
    /// # Errors
    ///
    /// - `RequestInFlight` if another request on this connection is pending.
    /// - `Timeout` if the deadline expires; the slot is freed and the
    ///   correlator closes, since the owed reply can no longer be attributed.
    /// - `ConnectionClosed` if the connection closes before the reply.
    /// - `Transport` if the message cannot be queued.
    pub async fn issue(
        &self,
        sender: &MessageSender,
        message_type: MessageType,
        body: String,
    ) -> Result<Reply, RequestError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut slot = self.lock();
            if slot.closed {
                return Err(RequestError::ConnectionClosed);
            }
            if let Some(pending) = &slot.pending {
                return Err(RequestError::RequestInFlight {
                    pending: pending.message_type.as_str().to_string(),
                });
            }
            slot.pending = Some(PendingRequest {
                id,
                message_type,
                reply_tx,
            });
        }

        let mut guard = PendingGuard {
            correlator: self,
            id,
            sent: false,
        };

        tracing::debug!(request = id, message_type = %message_type, "sending request");
        sender.send(Message::new(message_type, body))?;
        guard.sent = true;

        let received = match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, reply_rx)
                .await
                .map_err(|_| RequestError::Timeout {
                    timeout_ms: timeout_ms(timeout),
                })?,
            None => reply_rx.await,
        };

        received.map_err(|_| RequestError::ConnectionClosed)
    }

    /// Complete the pending request with `reply`.
    ///
    /// A reply with no pending request is dropped.
    pub fn complete(&self, reply: Reply) {
        let mut slot = self.lock();

        if slot.closed {
            tracing::debug!("dropping reply on closed connection");
            return;
        }

        match slot.pending.take() {
            Some(pending) => {
                if pending.reply_tx.send(reply).is_err() {
                    tracing::debug!(
                        request = pending.id,
                        "reply arrived after caller stopped waiting"
                    );
                }
            }
            None => tracing::warn!("dropping unsolicited reply"),
        }
    }

    /// Fail the pending request and refuse new ones.
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        // Dropping the sender wakes the caller with ConnectionClosed
        slot.pending = None;
    }

    fn release(&self, id: u64, sent: bool) {
        let mut slot = self.lock();
        if slot.pending.as_ref().map(|p| p.id) != Some(id) {
            return;
        }
        slot.pending = None;
        if sent && !slot.closed {
            slot.closed = true;
            tracing::warn!(
                request = id,
                "request abandoned before its reply arrived; closing connection"
            );
        }
    }
}

/// Frees the slot when `issue` returns or its future is dropped, unless the
/// reply already did.
struct PendingGuard<'a> {
    correlator: &'a RequestCorrelator,
    id: u64,
    sent: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.release(self.id, self.sent);
    }
}
