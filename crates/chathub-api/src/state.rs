//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use chathub_core::config::AppConfig;
use chathub_core::result::AppResult;
use chathub_core::traits::IdentityVerifier;
use chathub_database::Storage;
use chathub_realtime::RealtimeEngine;
use chathub_service::{CallService, CallWatchdog, TurnService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are cheap to clone across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Storage collaborator
    pub storage: Storage,
    /// Bearer-token verifier shared by HTTP and WebSocket
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Real-time engine
    pub realtime: RealtimeEngine,
    /// Call state machine
    pub call_service: CallService,
    /// Ringing watchdog
    pub call_watchdog: CallWatchdog,
    /// TURN/STUN broker
    pub turn_service: TurnService,
    /// When the state was built
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Wires every service over the given storage and verifier.
    pub fn new(
        config: AppConfig,
        storage: Storage,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> AppResult<Self> {
        let realtime = RealtimeEngine::new(config.realtime.clone(), &storage, verifier.clone());
        let call_service = CallService::new(
            storage.calls.clone(),
            storage.users.clone(),
            storage.contacts.clone(),
            realtime.registry.clone(),
        );
        let call_watchdog = CallWatchdog::new(
            storage.calls.clone(),
            storage.users.clone(),
            realtime.registry.clone(),
            &config.realtime,
        );
        let turn_service = TurnService::new(config.turn.clone())?;

        Ok(Self {
            config: Arc::new(config),
            storage,
            verifier,
            realtime,
            call_service,
            call_watchdog,
            turn_service,
            started_at: Utc::now(),
        })
    }
}
