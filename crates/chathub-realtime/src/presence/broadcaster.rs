//! Presence broadcaster: registers connections and tells watchers.
//!
//! A user is online exactly while the registry holds an entry for them.
//! Going online or offline is persisted through the user store and then
//! announced to every user who keeps the subject as a contact.
//!
//! Transitions for one user are serialized by a per-user lock held from
//! the registry change through the announcement, so watchers always see
//! a user's presence events in the order the registry changed.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use chathub_core::result::AppResult;
use chathub_core::types::UserId;
use chathub_database::store::{ContactStore, UserStore};

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;
use crate::message::types::OutboundEvent;

/// Outcome of [`PresenceBroadcaster::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Whether an older connection for the same user was evicted.
    pub replaced: bool,
    /// Watchers that received `presence:online`.
    pub notified: usize,
}

/// Drives the registry on connect/disconnect and fans presence out.
#[derive(Debug, Clone)]
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    users: Arc<dyn UserStore>,
    contacts: Arc<dyn ContactStore>,
    transitions: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl PresenceBroadcaster {
    /// Creates a broadcaster over the registry and the user/contact stores.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        users: Arc<dyn UserStore>,
        contacts: Arc<dyn ContactStore>,
    ) -> Self {
        Self {
            registry,
            users,
            contacts,
            transitions: Arc::new(DashMap::new()),
        }
    }

    /// Waits for any in-flight presence transition of `user_id` to finish.
    async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .transitions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the user's lock entry once nobody else holds or awaits it.
    fn release_user(&self, user_id: UserId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        self.transitions
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Registers an authenticated connection and announces the user online.
    ///
    /// An evicted older connection receives `session:replaced` and is
    /// closed; the user never went offline so no second announcement is
    /// made. If persisting presence fails the registration is rolled back.
    pub async fn connect(&self, handle: Arc<ConnectionHandle>) -> AppResult<ConnectOutcome> {
        let user_id = handle.user_id;
        let guard = self.lock_user(user_id).await;
        let previous = self.registry.register(handle.clone());
        let replaced = previous.is_some();
        if let Some(old) = previous {
            old.send(builder::session_replaced());
            old.mark_closed();
        }

        let announce = async {
            self.users.set_presence(user_id, true, None).await?;
            if replaced {
                return Ok(0);
            }
            self.notify_watchers(user_id, builder::presence_online(user_id))
                .await
        };

        let result = announce.await;
        if result.is_err() {
            self.registry.unregister(user_id, handle.id);
        }
        self.release_user(user_id, guard);

        match result {
            Ok(notified) => {
                info!(
                    user_id = %user_id,
                    conn_id = %handle.id,
                    replaced,
                    notified,
                    "User online"
                );
                Ok(ConnectOutcome { replaced, notified })
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to publish presence, dropping connection");
                Err(e)
            }
        }
    }

    /// Unregisters a connection and, if it was the live one, announces
    /// the user offline.
    ///
    /// Returns `Ok(false)` for a connection that had already been replaced;
    /// in that case neither storage nor watchers are touched.
    pub async fn disconnect(&self, handle: &ConnectionHandle) -> AppResult<bool> {
        let user_id = handle.user_id;
        let guard = self.lock_user(user_id).await;
        if !self.registry.unregister(user_id, handle.id) {
            self.release_user(user_id, guard);
            debug!(user_id = %user_id, conn_id = %handle.id, "Stale disconnect ignored");
            return Ok(false);
        }

        let now = Utc::now();
        let announce = async {
            self.users.set_presence(user_id, false, Some(now)).await?;
            self.notify_watchers(user_id, builder::presence_offline(user_id, now))
                .await
        };
        let result = announce.await;
        self.release_user(user_id, guard);

        let notified = result?;
        info!(user_id = %user_id, conn_id = %handle.id, notified, "User offline");
        Ok(true)
    }

    /// Sends `event` to every live watcher of `user_id`; misses are skipped.
    async fn notify_watchers(&self, user_id: UserId, event: OutboundEvent) -> AppResult<usize> {
        let watchers = self.contacts.watchers_of(user_id).await?;
        let delivered = watchers
            .into_iter()
            .filter(|watcher| *watcher != user_id)
            .filter(|watcher| self.registry.send(*watcher, event.clone()))
            .count();
        Ok(delivered)
    }
}
