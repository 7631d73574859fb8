//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{ChatId, MessageId, UserId};

use super::kind::MessageKind;

/// A persisted chat message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Conversation the message belongs to.
    #[serde(rename = "conversationId")]
    pub chat_id: ChatId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Text body (may be empty when attachments are present).
    pub content: String,
    /// Content kind.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: MessageKind,
    /// Media URLs.
    pub attachments: Vec<String>,
    /// Message this one replies to.
    pub reply_to_id: Option<MessageId>,
    /// Whether a recipient has read the message.
    pub read: bool,
    /// Storage-assigned ordering key.
    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Target conversation.
    pub chat_id: ChatId,
    /// Author.
    pub sender_id: UserId,
    /// Text body.
    pub content: String,
    /// Content kind.
    pub kind: MessageKind,
    /// Media URLs.
    pub attachments: Vec<String>,
    /// Message being replied to.
    pub reply_to_id: Option<MessageId>,
}
