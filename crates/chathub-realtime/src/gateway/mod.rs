//! Inbound event routing for live connections.

pub mod dispatch;

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use chathub_core::error::AppError;
use chathub_core::result::AppResult;

use crate::connection::handle::ConnectionHandle;
use crate::fanout::engine::FanoutEngine;
use crate::message::builder;
use crate::message::types::{
    InboundFrame, MessageReadPayload, OutboundEvent, SendMessagePayload, TypingPayload,
};
use crate::message::validator::{parse_frame, parse_signal, payload};
use crate::metrics::RealtimeMetrics;
use crate::relay::signal::SignalRelay;

use self::dispatch::{DispatchTable, EventKind};

/// Routes inbound frames from a connection to the component that owns them.
///
/// Failures never close the connection. A frame with a `requestId` is
/// answered with an `ack`; otherwise a failure is reported as an `error`
/// event.
#[derive(Debug, Clone)]
pub struct Gateway {
    table: Arc<DispatchTable>,
    fanout: FanoutEngine,
    relay: SignalRelay,
    metrics: Arc<RealtimeMetrics>,
    max_frame_bytes: usize,
}

impl Gateway {
    /// Creates a gateway over the fan-out engine and signal relay.
    pub fn new(
        fanout: FanoutEngine,
        relay: SignalRelay,
        metrics: Arc<RealtimeMetrics>,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            table: Arc::new(DispatchTable::new()),
            fanout,
            relay,
            metrics,
            max_frame_bytes,
        }
    }

    /// Handles one raw text frame from `conn`.
    pub async fn handle_frame(&self, conn: &ConnectionHandle, raw: &str) {
        conn.touch();
        self.metrics.frame_received();

        let frame = match parse_frame(raw, self.max_frame_bytes) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(conn_id = %conn.id, error = %e, "Rejected inbound frame");
                self.reply(conn, builder::error(&e));
                return;
            }
        };

        let InboundFrame {
            event,
            data,
            request_id,
        } = frame;

        let Some(kind) = self.table.resolve(&event) else {
            let err = AppError::validation(format!("Unknown event: {event}"));
            self.respond(conn, request_id, Err(err));
            return;
        };

        if kind == EventKind::Ping {
            self.reply(conn, builder::pong());
            return;
        }

        let result = self.dispatch(conn, kind, &event, data).await;
        if let Err(e) = &result {
            if !e.kind.is_client_error() {
                warn!(conn_id = %conn.id, user_id = %conn.user_id, event = %event, error = %e, "Event failed");
            } else {
                debug!(conn_id = %conn.id, user_id = %conn.user_id, event = %event, error = %e, "Event rejected");
            }
        }
        self.respond(conn, request_id, result);
    }

    async fn dispatch(
        &self,
        conn: &ConnectionHandle,
        kind: EventKind,
        event: &str,
        data: Value,
    ) -> AppResult<Option<Value>> {
        let user = conn.user_id;
        match kind {
            EventKind::SendMessage => {
                let body: SendMessagePayload = payload(event, data)?;
                let delivery = self.fanout.send_message(user, body).await?;
                Ok(Some(serde_json::to_value(&delivery.item)?))
            }
            EventKind::MessageRead => {
                let body: MessageReadPayload = payload(event, data)?;
                let delivery = self.fanout.mark_read(user, body.message_id).await?;
                Ok(Some(json!({ "messageId": delivery.item.id })))
            }
            EventKind::TypingStart | EventKind::TypingStop => {
                let body: TypingPayload = payload(event, data)?;
                self.fanout
                    .typing(user, body.conversation_id, kind == EventKind::TypingStart)
                    .await?;
                Ok(None)
            }
            EventKind::Signal(signal) => {
                let envelope = parse_signal(data)?;
                self.relay.relay(user, signal, envelope).await?;
                Ok(None)
            }
            EventKind::Ping => Ok(None),
        }
    }

    fn respond(
        &self,
        conn: &ConnectionHandle,
        request_id: Option<String>,
        result: AppResult<Option<Value>>,
    ) {
        match (request_id, result) {
            (Some(id), Ok(data)) => self.reply(conn, builder::ack(id, Ok(data))),
            (Some(id), Err(e)) => self.reply(conn, builder::ack(id, Err(&e))),
            (None, Err(e)) => self.reply(conn, builder::error(&e)),
            (None, Ok(_)) => {}
        }
    }

    fn reply(&self, conn: &ConnectionHandle, event: OutboundEvent) {
        if conn.send(event) {
            self.metrics.event_sent();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::sync::mpsc;

    use chathub_core::types::UserId;
    use chathub_database::memory::MemoryStore;
    use chathub_database::store::CallStore;
    use chathub_entity::call::{CallType, NewCall};

    use super::*;
    use crate::connection::registry::ConnectionRegistry;

    struct Fixture {
        gateway: Gateway,
        registry: Arc<ConnectionRegistry>,
        store: Arc<MemoryStore>,
        metrics: Arc<RealtimeMetrics>,
    }

    fn fixture(enforce_call_parties: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new(metrics.clone()));
        let fanout = FanoutEngine::new(
            registry.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        let relay = SignalRelay::new(
            registry.clone(),
            store.clone(),
            metrics.clone(),
            enforce_call_parties,
        );
        Fixture {
            gateway: Gateway::new(fanout, relay, metrics.clone(), 4096),
            registry,
            store,
            metrics,
        }
    }

    fn connect(
        registry: &ConnectionRegistry,
        user: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>) {
        let (handle, rx) = ConnectionHandle::new(user, None, 16);
        let handle = Arc::new(handle);
        registry.register(handle.clone());
        (handle, rx)
    }

    #[tokio::test]
    async fn test_ping_answers_pong() {
        let fx = fixture(true);
        let (conn, mut rx) = connect(&fx.registry, UserId::new());

        fx.gateway.handle_frame(&conn, r#"{"event":"ping"}"#).await;

        let event = rx.try_recv().expect("pong queued");
        assert_eq!(event.event, "pong");
        assert!(event.data["timestamp"].is_i64());
        assert_eq!(fx.metrics.snapshot().frames_received, 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_error() {
        let fx = fixture(true);
        let (conn, mut rx) = connect(&fx.registry, UserId::new());

        fx.gateway.handle_frame(&conn, "not json").await;

        let event = rx.try_recv().expect("error queued");
        assert_eq!(event.event, "error");
        assert_eq!(event.data["code"], "VALIDATION");
        assert!(conn.is_alive());
    }

    #[tokio::test]
    async fn test_unknown_event_is_nacked_when_request_id_present() {
        let fx = fixture(true);
        let (conn, mut rx) = connect(&fx.registry, UserId::new());

        fx.gateway
            .handle_frame(&conn, r#"{"event":"call:incoming","data":{},"requestId":"r-9"}"#)
            .await;

        let event = rx.try_recv().expect("ack queued");
        assert_eq!(event.event, "ack");
        assert_eq!(event.data["requestId"], "r-9");
        assert_eq!(event.data["success"], false);
        assert_eq!(event.data["error"]["code"], "VALIDATION");
    }

    #[tokio::test]
    async fn test_send_message_acks_with_persisted_message() {
        let fx = fixture(true);
        let alice = fx.store.seed_user("alice").await.id;
        let bob = fx.store.seed_user("bob").await.id;
        let chat = fx.store.seed_chat(&[alice, bob]).await.id;
        let (alice_conn, mut alice_rx) = connect(&fx.registry, alice);
        let (_bob_conn, mut bob_rx) = connect(&fx.registry, bob);

        let frame = json!({
            "event": "message:send",
            "data": { "conversationId": chat, "content": "hi" },
            "requestId": "r-1",
        });
        fx.gateway.handle_frame(&alice_conn, &frame.to_string()).await;

        let broadcast = bob_rx.try_recv().expect("bob receives message:new");
        assert_eq!(broadcast.event, "message:new");
        assert_eq!(broadcast.data["content"], "hi");
        assert_eq!(broadcast.data["sender"]["username"], "alice");

        let echo = alice_rx.try_recv().expect("sender receives its own message");
        assert_eq!(echo.event, "message:new");
        let ack = alice_rx.try_recv().expect("ack queued");
        assert_eq!(ack.event, "ack");
        assert_eq!(ack.data["success"], true);
        assert_eq!(ack.data["data"]["id"], broadcast.data["id"]);
    }

    #[tokio::test]
    async fn test_failure_without_request_id_sends_error_event() {
        let fx = fixture(true);
        let alice = fx.store.seed_user("alice").await.id;
        let bob = fx.store.seed_user("bob").await.id;
        let carol = fx.store.seed_user("carol").await.id;
        let chat = fx.store.seed_chat(&[alice, bob]).await.id;
        let (carol_conn, mut carol_rx) = connect(&fx.registry, carol);

        let frame = json!({
            "event": "message:send",
            "data": { "conversationId": chat, "content": "let me in" },
        });
        fx.gateway.handle_frame(&carol_conn, &frame.to_string()).await;

        let event = carol_rx.try_recv().expect("error queued");
        assert_eq!(event.event, "error");
        assert_eq!(event.data["code"], "AUTHORIZATION");
        assert_eq!(fx.store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_signal_without_call_is_rejected_under_enforcement() {
        let fx = fixture(true);
        let alice = UserId::new();
        let bob = UserId::new();
        let (alice_conn, mut alice_rx) = connect(&fx.registry, alice);
        let (_bob_conn, mut bob_rx) = connect(&fx.registry, bob);

        let frame = json!({
            "event": "webrtc:offer",
            "data": { "to": bob, "signal": { "sdp": "v=0" } },
            "requestId": "r-2",
        });
        fx.gateway.handle_frame(&alice_conn, &frame.to_string()).await;

        assert!(bob_rx.try_recv().is_err());
        let ack = alice_rx.try_recv().expect("nack queued");
        assert_eq!(ack.data["success"], false);
        assert_eq!(ack.data["error"]["code"], "AUTHORIZATION");
        assert_eq!(fx.metrics.snapshot().signals_dropped, 1);
    }

    #[tokio::test]
    async fn test_signal_relayed_when_enforcement_disabled() {
        let fx = fixture(false);
        let alice = UserId::new();
        let bob = UserId::new();
        let (alice_conn, _alice_rx) = connect(&fx.registry, alice);
        let (_bob_conn, mut bob_rx) = connect(&fx.registry, bob);

        let frame = json!({
            "event": "webrtc:ice",
            "data": { "to": bob, "from": "spoofed", "candidate": "c1" },
        });
        fx.gateway.handle_frame(&alice_conn, &frame.to_string()).await;

        let event = bob_rx.try_recv().expect("signal relayed");
        assert_eq!(event.event, "webrtc:ice");
        assert_eq!(event.data["from"], json!(alice.to_string()));
        assert_eq!(event.data["candidate"], "c1");
    }

    #[tokio::test]
    async fn test_signal_to_offline_party_is_dropped_silently() {
        let fx = fixture(true);
        let alice = fx.store.seed_user("alice").await.id;
        let bob = fx.store.seed_user("bob").await.id;
        let call = fx
            .store
            .create_call(NewCall {
                caller_id: alice,
                receiver_id: bob,
                call_type: CallType::Video,
            })
            .await
            .unwrap();
        let (alice_conn, mut alice_rx) = connect(&fx.registry, alice);

        let frame = json!({
            "event": "webrtc:offer",
            "data": { "callId": call.id, "to": bob, "signal": { "sdp": "v=0" } },
        });
        fx.gateway.handle_frame(&alice_conn, &frame.to_string()).await;
        assert!(alice_rx.try_recv().is_err());

        let frame = json!({
            "event": "webrtc:ice",
            "data": { "callId": call.id, "to": bob, "candidate": "c1" },
            "requestId": "r-3",
        });
        fx.gateway.handle_frame(&alice_conn, &frame.to_string()).await;
        let ack = alice_rx.try_recv().expect("ack queued");
        assert_eq!(ack.event, "ack");
        assert_eq!(ack.data["success"], true);
        assert!(alice_rx.try_recv().is_err());

        assert_eq!(fx.metrics.snapshot().signals_dropped, 2);
        assert!(alice_conn.is_alive());
    }
}
