//! Route definitions for the ChatHub HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket upgrade lives at
//! `/ws`. The router receives `AppState` and passes it to all handlers
//! via Axum's `State` extractor.

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(call_routes())
        .merge(turn_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(handlers::ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors::build_cors_layer(&state.config.server.cors))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Call control: initiate, answer, reject, end, history, delete
fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/calls/initiate", post(handlers::call::initiate))
        .route("/calls/history", get(handlers::call::history))
        .route("/calls/{id}", delete(handlers::call::delete))
        .route("/calls/{id}/answer", post(handlers::call::answer))
        .route("/calls/{id}/reject", post(handlers::call::reject))
        .route("/calls/{id}/end", post(handlers::call::end))
}

/// ICE server credentials
fn turn_routes() -> Router<AppState> {
    Router::new().route("/turn/credentials", get(handlers::turn::credentials))
}

/// Liveness and detailed health
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
