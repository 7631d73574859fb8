//! Inbound and outbound frame definitions.
//!
//! Every frame is a JSON text message. Clients send
//! `{"event": name, "data": {...}, "requestId": optional}` and the server
//! pushes `{"event": name, "data": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use chathub_core::types::{CallId, ChatId, MessageId, UserId};
use chathub_entity::message::MessageKind;

/// A frame received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    /// Event name, e.g. `message:send`.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
    /// Correlation id; when present the server answers with an `ack`.
    #[serde(default)]
    pub request_id: Option<String>,
}

/// An event pushed to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEvent {
    /// Event name.
    pub event: &'static str,
    /// Event payload.
    pub data: Value,
}

impl OutboundEvent {
    /// Build an event from a name and payload.
    pub fn new(event: &'static str, data: Value) -> Self {
        Self { event, data }
    }
}

/// `message:send` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    /// Target conversation.
    pub conversation_id: ChatId,
    /// Text body.
    #[serde(default)]
    pub content: String,
    /// Content kind; defaults to text.
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    /// Media URLs.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Message being replied to.
    #[serde(default)]
    pub reply_to_id: Option<MessageId>,
}

/// `typing:start` / `typing:stop` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Conversation being typed in.
    pub conversation_id: ChatId,
}

/// `message:read` payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    /// Message that was read.
    pub message_id: MessageId,
}

/// A WebRTC signaling envelope as received from the sender.
///
/// Only `to` and `callId` are interpreted; every other field is forwarded
/// untouched. Any client-supplied `from` is overwritten by the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    /// Call the signal belongs to.
    pub call_id: Option<CallId>,
    /// Recipient.
    pub target: UserId,
    /// The full payload object.
    pub payload: Map<String, Value>,
}

/// Which WebRTC negotiation step a signal carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// SDP offer.
    Offer,
    /// SDP answer.
    Answer,
    /// ICE candidate.
    Ice,
}

impl SignalKind {
    /// Event name used in both directions.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Offer => "webrtc:offer",
            Self::Answer => "webrtc:answer",
            Self::Ice => "webrtc:ice",
        }
    }
}

/// Body of an `ack` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    /// Echo of the inbound `requestId`.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Result payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

/// Body of an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
