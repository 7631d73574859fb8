//! Frame and payload validation rules.

use serde::de::DeserializeOwned;
use serde_json::Value;

use chathub_core::error::AppError;
use chathub_core::types::{CallId, UserId};

use super::types::{InboundFrame, SendMessagePayload, SignalEnvelope};

/// Longest accepted message body, in characters.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Most attachments one message may carry.
pub const MAX_ATTACHMENTS: usize = 10;

/// Parse a raw text frame, enforcing the size limit.
pub fn parse_frame(raw: &str, max_bytes: usize) -> Result<InboundFrame, AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation(format!(
            "Frame exceeds maximum size of {max_bytes} bytes"
        )));
    }
    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty frame"));
    }
    let frame: InboundFrame = serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("Failed to parse frame: {e}")))?;
    if frame.event.is_empty() {
        return Err(AppError::validation("Frame has no event name"));
    }
    Ok(frame)
}

/// Deserialize an event payload into its typed form.
pub fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, AppError> {
    serde_json::from_value(data)
        .map_err(|e| AppError::validation(format!("Invalid {event} payload: {e}")))
}

/// Content rules for `message:send`.
pub fn validate_send_message(payload: &SendMessagePayload) -> Result<(), AppError> {
    if payload.content.trim().is_empty() && payload.attachments.is_empty() {
        return Err(AppError::validation(
            "Message must have content or at least one attachment",
        ));
    }
    if payload.content.chars().count() > MAX_CONTENT_CHARS {
        return Err(AppError::validation(format!(
            "Message content exceeds {MAX_CONTENT_CHARS} characters"
        )));
    }
    if payload.attachments.len() > MAX_ATTACHMENTS {
        return Err(AppError::validation(format!(
            "At most {MAX_ATTACHMENTS} attachments are allowed"
        )));
    }
    if payload.attachments.iter().any(|a| a.trim().is_empty()) {
        return Err(AppError::validation("Attachment URL must not be empty"));
    }
    Ok(())
}

/// Split a `webrtc:*` payload into its routing fields and the opaque body.
pub fn parse_signal(data: Value) -> Result<SignalEnvelope, AppError> {
    let Value::Object(payload) = data else {
        return Err(AppError::validation("Signal payload must be an object"));
    };
    let target = payload
        .get("to")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::validation("Signal payload is missing \"to\""))?
        .parse::<UserId>()
        .map_err(|_| AppError::validation("Signal target is not a valid user id"))?;
    let call_id = match payload.get("callId") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value
                .as_str()
                .and_then(|s| s.parse::<CallId>().ok())
                .ok_or_else(|| AppError::validation("Signal callId is not a valid call id"))?,
        ),
    };
    Ok(SignalEnvelope {
        call_id,
        target,
        payload,
    })
}
