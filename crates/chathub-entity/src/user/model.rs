//! User summary model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::UserId;

/// The slice of a user row the real-time layer reads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Unique user identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique handle.
    pub username: String,
    /// Avatar URL.
    pub avatar: Option<String>,
    /// Whether the user currently holds a live connection.
    pub is_online: bool,
    /// When the user was last seen online.
    pub last_seen: Option<DateTime<Utc>>,
}

/// Public identity of a user embedded in call and message payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<UserSummary> for UserProfile {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            avatar: user.avatar,
        }
    }
}
