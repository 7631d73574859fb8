//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use chathub_core::types::{ConnectionId, UserId};

use crate::message::types::OutboundEvent;

/// A handle to a single live transport connection.
///
/// Holds the sender half of the connection's outbound queue plus metadata
/// about the connected user. The socket task owns the receiver.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// User who owns this connection
    pub user_id: UserId,
    /// Display name (cached for logs)
    pub display_name: Option<String>,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<OutboundEvent>,
    last_activity_ms: AtomicI64,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new handle and the receiver its socket task drains.
    pub fn new(
        user_id: UserId,
        display_name: Option<String>,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let now = Utc::now();
        let handle = Self {
            id: ConnectionId::new(),
            user_id,
            display_name,
            connected_at: now,
            sender,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
            closed: CancellationToken::new(),
        };
        (handle, receiver)
    }

    /// Queue an event without waiting. Returns `false` if it was dropped.
    pub fn send(&self, event: OutboundEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(
                    conn_id = %self.id,
                    event = event.event,
                    "Connection send buffer full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        !self.closed.is_cancelled() && !self.sender.is_closed()
    }

    /// Ask the socket task to flush what is queued and close.
    pub fn mark_closed(&self) {
        self.closed.cancel();
    }

    /// Token cancelled once the connection is closing.
    pub fn closed(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Update last activity timestamp
    pub fn touch(&self) {
        self.last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Last time the client sent a frame.
    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::Relaxed))
            .unwrap_or(self.connected_at)
    }
}
