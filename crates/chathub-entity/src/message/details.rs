//! A message together with its author and the message it replies to.

use serde::{Deserialize, Serialize};

use crate::user::UserProfile;

use super::model::Message;

/// The parent of a reply, with its own author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyPreview {
    #[serde(flatten)]
    pub message: Message,
    pub sender: Option<UserProfile>,
}

/// Payload of `message:new` and of the sender's ack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetails {
    #[serde(flatten)]
    pub message: Message,
    pub sender: Option<UserProfile>,
    pub reply_to: Option<ReplyPreview>,
}
