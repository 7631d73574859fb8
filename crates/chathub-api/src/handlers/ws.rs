//! WebSocket upgrade handler and per-connection socket loop.

use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use chathub_core::error::AppError;
use chathub_core::traits::VerifiedIdentity;
use chathub_realtime::OutboundEvent;
use chathub_realtime::message::builder;

use crate::extractors::bearer_token;
use crate::state::AppState;

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// JWT access token. The Authorization header is used when absent.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
///
/// The socket is always upgraded; a bad token is reported with an `error`
/// event followed by a close frame, and nothing is registered.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = query
        .token
        .or_else(|| bearer_token(&headers).map(str::to_string));

    ws.on_upgrade(move |socket| async move {
        match state.realtime.authenticate(token.as_deref()).await {
            Ok(identity) => handle_connection(state, identity, socket).await,
            Err(e) => reject(socket, &e).await,
        }
    })
}

/// Sends an `error` event and closes the socket.
async fn reject(mut socket: WebSocket, err: &AppError) {
    debug!(error = %err, "Closing unauthenticated WebSocket");
    if let Some(text) = encode(&builder::error(err)) {
        let _ = socket.send(Message::Text(text.into())).await;
    }
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::POLICY,
            reason: err.message.clone().into(),
        })))
        .await;
}

/// Drives one authenticated connection until either side goes away.
async fn handle_connection(state: AppState, identity: VerifiedIdentity, socket: WebSocket) {
    let (handle, outbound_rx) = match state.realtime.connect(identity).await {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "Failed to open WebSocket session");
            reject(socket, &e).await;
            return;
        }
    };

    let conn_id = handle.id;
    let user_id = handle.user_id;
    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection established");

    let (ws_tx, mut ws_rx) = socket.split();
    let outbound_task = tokio::spawn(forward_outbound(ws_tx, outbound_rx, handle.closed()));

    let closed = handle.closed();
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.realtime.handle_frame(&handle, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    handle.send(builder::error(&AppError::validation(
                        "Binary frames are not supported",
                    )));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => handle.touch(),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(conn_id = %conn_id, error = %e, "WebSocket read error");
                    break;
                }
            }
        }
    }

    state.realtime.disconnect(&handle).await;
    if let Err(e) = outbound_task.await {
        error!(conn_id = %conn_id, error = %e, "Outbound task failed");
    }

    info!(conn_id = %conn_id, user_id = %user_id, "WebSocket connection closed");
}

/// Writes queued events to the socket. When the connection is closed the
/// events already queued (e.g. `session:replaced`) are flushed before the
/// close frame.
async fn forward_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundEvent>,
    closed: tokio_util::sync::CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut ws_tx, &event).await.is_err() {
                    return;
                }
            }
            _ = closed.cancelled() => {
                while let Ok(event) = outbound_rx.try_recv() {
                    if send_event(&mut ws_tx, &event).await.is_err() {
                        return;
                    }
                }
                break;
            }
        }
    }
    let _ = ws_tx.send(Message::Close(None)).await;
}

async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    event: &OutboundEvent,
) -> Result<(), axum::Error> {
    match encode(event) {
        Some(text) => ws_tx.send(Message::Text(text.into())).await,
        None => Ok(()),
    }
}

fn encode(event: &OutboundEvent) -> Option<String> {
    serde_json::to_string(event)
        .inspect_err(|e| error!(event = event.event, error = %e, "Failed to encode event"))
        .ok()
}
