//! Contact entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{ContactId, UserId};

/// A directed contact edge: `user_id` keeps `contact_id` in their list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Unique row identifier.
    pub id: ContactId,
    /// Owner of the contact list.
    pub user_id: UserId,
    /// The user being kept as a contact.
    pub contact_id: UserId,
    /// Optional nickname chosen by the owner.
    pub nickname: Option<String>,
    /// Whether the owner has blocked this contact.
    pub is_blocked: bool,
    /// When the edge was created.
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Whether the edge allows the owner to reach the contact.
    pub fn is_usable(&self) -> bool {
        !self.is_blocked
    }
}
