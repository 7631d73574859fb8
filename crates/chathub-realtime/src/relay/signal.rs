//! Signal relay: forwards offers, answers and ICE candidates.
//!
//! The payload is never inspected. The sender's identity comes from the
//! connection and is injected as `from`. Delivery is best-effort: an
//! offline target is logged and counted, never reported to the sender.

use std::sync::Arc;

use tracing::{debug, warn};

use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::types::{CallId, UserId};
use chathub_database::store::CallStore;

use crate::connection::registry::ConnectionRegistry;
use crate::message::builder;
use crate::message::types::{SignalEnvelope, SignalKind};
use crate::metrics::RealtimeMetrics;

/// Stateless forwarder of WebRTC negotiation payloads.
#[derive(Debug, Clone)]
pub struct SignalRelay {
    registry: Arc<ConnectionRegistry>,
    calls: Arc<dyn CallStore>,
    metrics: Arc<RealtimeMetrics>,
    enforce_call_parties: bool,
}

impl SignalRelay {
    /// Creates a relay. With `enforce_call_parties` set, signals are only
    /// forwarded between the caller and receiver of a non-terminal call.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        calls: Arc<dyn CallStore>,
        metrics: Arc<RealtimeMetrics>,
        enforce_call_parties: bool,
    ) -> Self {
        Self {
            registry,
            calls,
            metrics,
            enforce_call_parties,
        }
    }

    /// Forwards `envelope` from `sender` to its target.
    ///
    /// Returns whether the target's connection accepted it. Fails only when
    /// party enforcement rejects the envelope.
    pub async fn relay(
        &self,
        sender: UserId,
        kind: SignalKind,
        envelope: SignalEnvelope,
    ) -> AppResult<bool> {
        let SignalEnvelope {
            call_id,
            target,
            payload,
        } = envelope;

        if self.enforce_call_parties {
            if let Err(e) = self.check_parties(sender, target, call_id).await {
                self.metrics.signal_dropped();
                warn!(
                    sender_id = %sender,
                    target_id = %target,
                    call_id = ?call_id,
                    signal = kind.event_name(),
                    error = %e,
                    "Signal rejected"
                );
                return Err(e);
            }
        }

        let delivered = self
            .registry
            .send(target, builder::signal(kind, payload, sender));
        if delivered {
            debug!(
                sender_id = %sender,
                target_id = %target,
                call_id = ?call_id,
                signal = kind.event_name(),
                "Signal forwarded"
            );
        } else {
            self.metrics.signal_dropped();
            warn!(
                sender_id = %sender,
                target_id = %target,
                call_id = ?call_id,
                signal = kind.event_name(),
                "Signal target not connected, dropped"
            );
        }
        Ok(delivered)
    }

    async fn check_parties(
        &self,
        sender: UserId,
        target: UserId,
        call_id: Option<CallId>,
    ) -> AppResult<()> {
        let call_id =
            call_id.ok_or_else(|| AppError::authorization("Signal does not reference a call"))?;
        let call = self
            .calls
            .find_call(call_id)
            .await?
            .ok_or_else(|| AppError::authorization("Signal references an unknown call"))?;
        if call.counterpart(sender) != Some(target) {
            return Err(AppError::authorization(
                "Signals may only be exchanged between the parties of a call",
            ));
        }
        if call.status.is_terminal() {
            return Err(AppError::authorization(format!(
                "Call is already {}",
                call.status
            )));
        }
        Ok(())
    }
}
