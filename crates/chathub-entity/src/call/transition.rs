//! Validated call state changes.

use chrono::{DateTime, Utc};

use super::status::CallStatus;

/// A state change applied to a stored call, carrying the columns it sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTransition {
    /// RINGING to ANSWERED; sets `started_at`.
    Answer {
        /// When the receiver picked up.
        at: DateTime<Utc>,
    },
    /// RINGING to REJECTED; sets `ended_at`.
    Reject {
        /// When the receiver declined.
        at: DateTime<Utc>,
    },
    /// RINGING or ANSWERED to ENDED; sets `ended_at` and `duration`.
    End {
        /// When the call was hung up.
        at: DateTime<Utc>,
        /// Reported talk time in seconds.
        duration: i32,
    },
    /// RINGING to MISSED; sets `ended_at`.
    Miss {
        /// When the watchdog gave up.
        at: DateTime<Utc>,
    },
}

impl CallTransition {
    /// Status the call lands in.
    pub fn target(&self) -> CallStatus {
        match self {
            Self::Answer { .. } => CallStatus::Answered,
            Self::Reject { .. } => CallStatus::Rejected,
            Self::End { .. } => CallStatus::Ended,
            Self::Miss { .. } => CallStatus::Missed,
        }
    }

    /// Statuses this transition may start from.
    pub fn allowed_from(&self) -> &'static [CallStatus] {
        match self {
            Self::Answer { .. } | Self::Reject { .. } | Self::Miss { .. } => &[CallStatus::Ringing],
            Self::End { .. } => &[CallStatus::Ringing, CallStatus::Answered],
        }
    }

    /// Short verb used in logs and error messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Answer { .. } => "answer",
            Self::Reject { .. } => "reject",
            Self::End { .. } => "end",
            Self::Miss { .. } => "miss",
        }
    }
}
