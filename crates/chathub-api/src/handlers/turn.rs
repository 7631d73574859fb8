//! TURN credential handler.

use axum::extract::State;
use tracing::debug;

use chathub_service::IceServers;

use crate::dto::response::ApiResponse;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/turn/credentials
pub async fn credentials(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResponse<IceServers> {
    let servers = state.turn_service.ice_servers().await;
    debug!(
        user_id = %auth.user_id(),
        count = servers.ice_servers.len(),
        provider = %servers.provider,
        "Serving ICE servers"
    );
    ApiResponse::ok(servers)
}
