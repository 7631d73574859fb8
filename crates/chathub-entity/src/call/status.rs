//! Call type and status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Media carried by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallType {
    /// Audio only.
    Voice,
    /// Audio and video.
    Video,
}

impl CallType {
    /// Return the type as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice => "VOICE",
            Self::Video => "VIDEO",
        }
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a call.
///
/// A call is created `RINGING`. From there the receiver may answer or
/// reject, either party may end it, and the ringing watchdog may mark it
/// missed. `ANSWERED` calls can only end. The remaining states are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "call_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    /// Waiting for the receiver.
    Ringing,
    /// Receiver picked up; media is flowing.
    Answered,
    /// Hung up by either party.
    Ended,
    /// Declined by the receiver.
    Rejected,
    /// Rang out without an answer.
    Missed,
}

impl CallStatus {
    /// Check if the call is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Rejected | Self::Missed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        matches!(
            (self, next),
            (Self::Ringing, Self::Answered)
                | (Self::Ringing, Self::Rejected)
                | (Self::Ringing, Self::Missed)
                | (Self::Ringing, Self::Ended)
                | (Self::Answered, Self::Ended)
        )
    }

    /// Return the status as an uppercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ringing => "RINGING",
            Self::Answered => "ANSWERED",
            Self::Ended => "ENDED",
            Self::Rejected => "REJECTED",
            Self::Missed => "MISSED",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
