//! Constructors for every outbound event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::error;

use chathub_core::error::AppError;
use chathub_core::types::{ChatId, MessageId, UserId};
use chathub_entity::call::CallDetails;
use chathub_entity::message::MessageDetails;

use super::types::{AckPayload, ErrorPayload, OutboundEvent, SignalKind};

/// Call lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    /// A new call is ringing for the receiver.
    Incoming,
    /// The receiver picked up.
    Answered,
    /// The receiver declined.
    Rejected,
    /// A party hung up.
    Ended,
    /// The call rang out.
    Missed,
}

impl CallEvent {
    /// Event name on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Incoming => "call:incoming",
            Self::Answered => "call:answered",
            Self::Rejected => "call:rejected",
            Self::Ended => "call:ended",
            Self::Missed => "call:missed",
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize outbound payload");
        Value::Null
    })
}

/// `presence:online`
pub fn presence_online(user_id: UserId) -> OutboundEvent {
    OutboundEvent::new(
        "presence:online",
        json!({ "userId": user_id, "isOnline": true }),
    )
}

/// `presence:offline`
pub fn presence_offline(user_id: UserId, last_seen_at: DateTime<Utc>) -> OutboundEvent {
    OutboundEvent::new(
        "presence:offline",
        json!({ "userId": user_id, "isOnline": false, "lastSeenAt": last_seen_at }),
    )
}

/// `message:new` carrying the persisted message, its sender and the
/// message it replies to.
pub fn message_new(message: &MessageDetails) -> OutboundEvent {
    OutboundEvent::new("message:new", to_value(message))
}

/// `message:read`
pub fn message_read(message_id: MessageId, reader_id: UserId, chat_id: ChatId) -> OutboundEvent {
    OutboundEvent::new(
        "message:read",
        json!({
            "messageId": message_id,
            "readerId": reader_id,
            "conversationId": chat_id,
        }),
    )
}

/// `typing:start` or `typing:stop`
pub fn typing(started: bool, user_id: UserId, chat_id: ChatId) -> OutboundEvent {
    let name = if started { "typing:start" } else { "typing:stop" };
    OutboundEvent::new(name, json!({ "userId": user_id, "conversationId": chat_id }))
}

/// `call:*` carrying the call row and both parties.
pub fn call(event: CallEvent, call: &CallDetails) -> OutboundEvent {
    OutboundEvent::new(event.event_name(), json!({ "call": to_value(call) }))
}

/// `webrtc:*` with the sender injected as `from`.
pub fn signal(kind: SignalKind, mut payload: Map<String, Value>, from: UserId) -> OutboundEvent {
    payload.insert("from".to_string(), to_value(&from));
    OutboundEvent::new(kind.event_name(), Value::Object(payload))
}

/// `ack` for a frame that carried a `requestId`.
pub fn ack(request_id: String, result: Result<Option<Value>, &AppError>) -> OutboundEvent {
    let payload = match result {
        Ok(data) => AckPayload {
            request_id,
            success: true,
            data,
            error: None,
        },
        Err(err) => AckPayload {
            request_id,
            success: false,
            data: None,
            error: Some(error_payload(err)),
        },
    };
    OutboundEvent::new("ack", to_value(&payload))
}

/// `pong`
pub fn pong() -> OutboundEvent {
    OutboundEvent::new("pong", json!({ "timestamp": Utc::now().timestamp_millis() }))
}

/// `error`
pub fn error(err: &AppError) -> OutboundEvent {
    OutboundEvent::new("error", to_value(&error_payload(err)))
}

/// `session:replaced`, sent to a connection evicted by a newer one.
pub fn session_replaced() -> OutboundEvent {
    OutboundEvent::new(
        "session:replaced",
        json!({ "message": "Another connection was opened for this account" }),
    )
}

fn error_payload(err: &AppError) -> ErrorPayload {
    ErrorPayload {
        code: err.kind.code().to_string(),
        message: err.message.clone(),
    }
}
