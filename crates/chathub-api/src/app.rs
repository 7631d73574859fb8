//! Application builder: wires router, middleware and state into an Axum
//! app, and runs it until shutdown.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chathub_auth::JwtIdentityVerifier;
use chathub_core::config::AppConfig;
use chathub_core::error::AppError;
use chathub_core::result::AppResult;
use chathub_database::Storage;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Runs the ChatHub server with the given configuration until `shutdown`
/// resolves.
pub async fn run_server(
    config: AppConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> AppResult<()> {
    info!(provider = ?config.database.provider, "Connecting storage");
    let storage = Storage::connect(&config.database).await?;
    let verifier = Arc::new(JwtIdentityVerifier::new(&config.auth, storage.users.clone()));
    let state = AppState::new(config, storage, verifier)?;

    let addr = state.config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "ChatHub server listening");

    serve(state, listener, shutdown).await
}

/// Serves `state` on `listener`, running the ringing watchdog alongside.
///
/// When `shutdown` resolves the watchdog stops, every WebSocket is closed
/// and in-flight requests get `server.shutdown_grace_seconds` to finish.
pub async fn serve(
    state: AppState,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> AppResult<()> {
    let stopping = CancellationToken::new();

    let watchdog = state.call_watchdog.clone();
    let watchdog_task = tokio::spawn({
        let cancel = stopping.clone();
        async move { watchdog.run(cancel).await }
    });

    let realtime = state.realtime.clone();
    let grace = state.config.server.shutdown_grace();
    let server = axum::serve(listener, build_app(state.clone()))
        .with_graceful_shutdown({
            let stopping = stopping.clone();
            async move {
                shutdown.await;
                info!("Shutdown signal received");
                stopping.cancel();
                realtime.shutdown().await;
            }
        })
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = async {
            stopping.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out");
        }
    }

    if let Err(e) = watchdog_task.await {
        warn!(error = %e, "Watchdog task failed");
    }
    state.storage.close().await;
    info!("ChatHub server stopped");
    Ok(())
}
