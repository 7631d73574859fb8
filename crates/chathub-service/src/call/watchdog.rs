//! Ringing watchdog: moves calls nobody picked up to `MISSED`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chathub_core::config::realtime::RealtimeConfig;
use chathub_core::result::AppResult;
use chathub_database::store::{CallStore, UserStore};
use chathub_entity::call::{CallStatus, CallTransition};
use chathub_realtime::ConnectionRegistry;
use chathub_realtime::message::builder::CallEvent;

use super::service::{notify, with_parties};

/// Periodic sweep over calls stuck in `RINGING`.
#[derive(Debug, Clone)]
pub struct CallWatchdog {
    calls: Arc<dyn CallStore>,
    users: Arc<dyn UserStore>,
    registry: Arc<ConnectionRegistry>,
    ring_timeout: Duration,
    interval: Duration,
}

impl CallWatchdog {
    /// Creates a watchdog from the real-time settings.
    pub fn new(
        calls: Arc<dyn CallStore>,
        users: Arc<dyn UserStore>,
        registry: Arc<ConnectionRegistry>,
        config: &RealtimeConfig,
    ) -> Self {
        Self {
            calls,
            users,
            registry,
            ring_timeout: Duration::from_secs(config.ring_timeout_seconds),
            interval: Duration::from_secs(config.watchdog_interval_seconds.max(1)),
        }
    }

    /// Whether a ring timeout is configured at all.
    pub fn is_enabled(&self) -> bool {
        !self.ring_timeout.is_zero()
    }

    /// Sweeps on every tick until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        if !self.is_enabled() {
            info!("Ringing watchdog disabled");
            return;
        }
        info!(
            ring_timeout_secs = self.ring_timeout.as_secs(),
            interval_secs = self.interval.as_secs(),
            "Ringing watchdog started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        warn!(error = %e, "Ringing watchdog sweep failed");
                    }
                }
            }
        }
        info!("Ringing watchdog stopped");
    }

    /// Marks every call ringing longer than the timeout as missed and tells
    /// both parties. Returns how many calls were moved.
    pub async fn sweep(&self) -> AppResult<usize> {
        let now = Utc::now();
        let timeout = chrono::Duration::from_std(self.ring_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        let stale = self.calls.stale_ringing(now - timeout).await?;

        let mut missed = 0;
        for call in stale {
            match self
                .calls
                .apply_transition(call.id, &[CallStatus::Ringing], CallTransition::Miss { at: now })
                .await
            {
                Ok(Some(call)) => {
                    info!(call_id = %call.id, "Call missed");
                    let call = with_parties(self.users.as_ref(), call).await;
                    notify(&self.registry, call.call.caller_id, CallEvent::Missed, &call);
                    notify(&self.registry, call.call.receiver_id, CallEvent::Missed, &call);
                    missed += 1;
                }
                Ok(None) => debug!(call_id = %call.id, "Call left RINGING before it timed out"),
                Err(e) => warn!(call_id = %call.id, error = %e, "Failed to mark call missed"),
            }
        }
        Ok(missed)
    }
}
