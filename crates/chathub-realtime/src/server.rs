//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chathub_core::config::realtime::RealtimeConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_core::traits::{IdentityVerifier, VerifiedIdentity};
use chathub_database::Storage;

use crate::connection::authenticator::WsAuthenticator;
use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::fanout::engine::FanoutEngine;
use crate::gateway::Gateway;
use crate::message::types::OutboundEvent;
use crate::metrics::RealtimeMetrics;
use crate::presence::broadcaster::PresenceBroadcaster;
use crate::relay::signal::SignalRelay;

/// Central real-time engine that coordinates all connection subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Presence broadcaster.
    pub presence: PresenceBroadcaster,
    /// Message fan-out.
    pub fanout: FanoutEngine,
    /// WebRTC signal relay.
    pub relay: SignalRelay,
    /// Inbound event router.
    pub gateway: Gateway,
    /// Handshake authenticator.
    pub authenticator: WsAuthenticator,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    config: RealtimeConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine")
            .field("connections", &self.registry.connection_count())
            .finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine over the shared storage.
    pub fn new(
        config: RealtimeConfig,
        storage: &Storage,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(metrics.clone()));
        let presence = PresenceBroadcaster::new(
            registry.clone(),
            storage.users.clone(),
            storage.contacts.clone(),
        );
        let fanout = FanoutEngine::new(
            registry.clone(),
            storage.chats.clone(),
            storage.messages.clone(),
            storage.users.clone(),
        );
        let relay = SignalRelay::new(
            registry.clone(),
            storage.calls.clone(),
            metrics.clone(),
            config.enforce_call_parties,
        );
        let gateway = Gateway::new(
            fanout.clone(),
            relay.clone(),
            metrics.clone(),
            config.max_frame_bytes,
        );

        info!(
            buffer = config.outbound_buffer_size,
            enforce_call_parties = config.enforce_call_parties,
            "Real-time engine initialized"
        );

        Self {
            registry,
            presence,
            fanout,
            relay,
            gateway,
            authenticator: WsAuthenticator::new(verifier),
            metrics,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Resolves a handshake token to a user.
    pub async fn authenticate(&self, token: Option<&str>) -> AppResult<VerifiedIdentity> {
        self.authenticator.authenticate(token).await
    }

    /// Opens a connection for an authenticated user and announces them.
    ///
    /// The returned receiver is the connection's outbound queue; the socket
    /// task must drain it until the handle's `closed` token fires.
    pub async fn connect(
        &self,
        identity: VerifiedIdentity,
    ) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>)> {
        if self.shutdown.is_cancelled() {
            return Err(AppError::internal("Server is shutting down"));
        }
        let (handle, rx) = ConnectionHandle::new(
            identity.user_id,
            identity.name,
            self.config.outbound_buffer_size,
        );
        let handle = Arc::new(handle);
        self.presence.connect(handle.clone()).await?;
        Ok((handle, rx))
    }

    /// Handles one inbound text frame.
    pub async fn handle_frame(&self, handle: &ConnectionHandle, raw: &str) {
        self.gateway.handle_frame(handle, raw).await;
    }

    /// Tears a connection down. Storage failures are logged, not returned,
    /// because the socket is already gone.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        handle.mark_closed();
        if let Err(e) = self.presence.disconnect(handle).await {
            warn!(user_id = %handle.user_id, conn_id = %handle.id, error = %e, "Failed to publish offline presence");
        }
    }

    /// Token cancelled when the engine begins shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Refuses new connections and closes every live one, announcing each
    /// user offline on the way out.
    pub async fn shutdown(&self) -> usize {
        info!("Shutting down real-time engine");
        self.shutdown.cancel();

        let mut closed = 0;
        for user_id in self.registry.connected_user_ids() {
            if let Some(handle) = self.registry.lookup(user_id) {
                self.disconnect(&handle).await;
                closed += 1;
            }
        }
        let stragglers = self.registry.close_all();
        if stragglers > 0 {
            warn!(stragglers, "Closed connections registered during shutdown");
        }
        info!(closed, "Real-time engine shut down");
        closed
    }
}
