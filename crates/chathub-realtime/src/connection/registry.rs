//! The connection registry: user id to the one live connection.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use chathub_core::types::{ConnectionId, UserId};

use crate::message::types::OutboundEvent;
use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;

/// Thread-safe map from a user to their single live connection.
///
/// All operations are synchronous and never await, so no caller can hold
/// a shard lock across storage or identity I/O. `send` queues the event
/// while still holding the entry, which means an event addressed to a user
/// can never land on a connection that has already been replaced.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, Arc<ConnectionHandle>>,
    metrics: Arc<RealtimeMetrics>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new(metrics: Arc<RealtimeMetrics>) -> Self {
        Self {
            connections: DashMap::new(),
            metrics,
        }
    }

    /// Registers `handle` for its user, returning the connection it replaced.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let user_id = handle.user_id;
        let conn_id = handle.id;
        let previous = self.connections.insert(user_id, handle);
        self.metrics.connection_opened();
        match &previous {
            Some(old) => {
                info!(
                    user_id = %user_id,
                    conn_id = %conn_id,
                    replaced_conn_id = %old.id,
                    "Connection replaced"
                );
                self.metrics.connection_closed();
            }
            None => debug!(user_id = %user_id, conn_id = %conn_id, "Connection registered"),
        }
        previous
    }

    /// Removes the entry only if it still points at `conn_id`.
    ///
    /// Returns whether anything was removed; a stale disconnect after a
    /// fast reconnect returns `false` and leaves the newer entry alone.
    pub fn unregister(&self, user_id: UserId, conn_id: ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, handle| handle.id == conn_id)
            .is_some();
        if removed {
            self.metrics.connection_closed();
            debug!(user_id = %user_id, conn_id = %conn_id, "Connection unregistered");
        }
        removed
    }

    /// Returns the live connection for `user_id`, if any.
    pub fn lookup(&self, user_id: UserId) -> Option<Arc<ConnectionHandle>> {
        self.connections
            .get(&user_id)
            .map(|entry| entry.value().clone())
    }

    /// Delivers `event` to the user's connection.
    ///
    /// Returns `false` when the user has no live connection or the event
    /// could not be queued. Misses are counted, never retried.
    pub fn send(&self, user_id: UserId, event: OutboundEvent) -> bool {
        let name = event.event;
        let delivered = match self.connections.get(&user_id) {
            Some(entry) => entry.value().send(event),
            None => false,
        };
        if delivered {
            self.metrics.event_sent();
        } else {
            self.metrics.delivery_miss();
            debug!(user_id = %user_id, event = name, "No live connection, event dropped");
        }
        delivered
    }

    /// Whether `user_id` currently has a live connection.
    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.connections.contains_key(&user_id)
    }

    /// Returns the number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns all connected user IDs.
    pub fn connected_user_ids(&self) -> Vec<UserId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Closes and removes every connection.
    pub fn close_all(&self) -> usize {
        let handles: Vec<Arc<ConnectionHandle>> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for handle in &handles {
            if self.unregister(handle.user_id, handle.id) {
                handle.mark_closed();
            }
        }
        info!(count = handles.len(), "All connections closed");
        handles.len()
    }
}
