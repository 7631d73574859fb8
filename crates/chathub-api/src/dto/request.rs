//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use chathub_core::types::UserId;
use chathub_entity::call::CallType;

/// `POST /api/calls/initiate` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    /// User to call.
    pub receiver_id: UserId,
    /// Voice or video.
    #[serde(rename = "type")]
    pub call_type: CallType,
}

/// `POST /api/calls/{id}/end` body. The whole body is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EndCallRequest {
    /// Talk time in seconds.
    #[validate(range(min = 0, message = "Call duration cannot be negative"))]
    pub duration: Option<i32>,
}
