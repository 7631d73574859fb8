//! Chat (conversation) entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{ChatId, UserId};

/// A one-to-one or group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Unique conversation identifier.
    pub id: ChatId,
    /// Whether this is a group conversation.
    pub is_group: bool,
    /// Group name (groups only).
    pub group_name: Option<String>,
    /// Creator of the conversation.
    pub created_by_id: Option<UserId>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// Ordering key for conversation lists; bumped on every new message.
    pub updated_at: DateTime<Utc>,
}
