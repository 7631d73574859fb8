//! Health check handlers.

use axum::extract::State;
use chrono::Utc;

use crate::dto::response::{ApiResponse, DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/health/detailed
///
/// Always 200; a storage outage shows up as `degraded`.
pub async fn health_detailed(State(state): State<AppState>) -> ApiResponse<DetailedHealthResponse> {
    let storage_ok = matches!(state.storage.health_check().await, Ok(true));
    let registry = &state.realtime.registry;

    ApiResponse::ok(DetailedHealthResponse {
        status: if storage_ok { "ok" } else { "degraded" },
        storage: if storage_ok { "connected" } else { "unavailable" },
        ws_connections: registry.connection_count(),
        online_users: registry.connected_user_ids().len(),
        metrics: state.realtime.metrics.snapshot(),
    })
}
