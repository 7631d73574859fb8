//! Call entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use chathub_core::types::{CallId, UserId};

use super::status::{CallStatus, CallType};
use super::transition::CallTransition;

/// One call attempt between a caller and a receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Unique call identifier.
    pub id: CallId,
    /// User who placed the call.
    pub caller_id: UserId,
    /// User being called.
    pub receiver_id: UserId,
    /// Voice or video.
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub call_type: CallType,
    /// Current lifecycle status.
    pub status: CallStatus,
    /// When the receiver answered.
    pub started_at: Option<DateTime<Utc>>,
    /// When the call reached a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    /// Talk time in seconds.
    pub duration: i32,
    /// When the attempt was created.
    pub created_at: DateTime<Utc>,
}

impl Call {
    /// Whether `user` is the caller or the receiver.
    pub fn is_party(&self, user: UserId) -> bool {
        self.caller_id == user || self.receiver_id == user
    }

    /// The party opposite `user`, if `user` is on the call.
    pub fn counterpart(&self, user: UserId) -> Option<UserId> {
        if user == self.caller_id {
            Some(self.receiver_id)
        } else if user == self.receiver_id {
            Some(self.caller_id)
        } else {
            None
        }
    }

    /// Apply a transition's columns in place. Callers check legality first.
    pub fn apply(&mut self, transition: CallTransition) {
        self.status = transition.target();
        match transition {
            CallTransition::Answer { at } => self.started_at = Some(at),
            CallTransition::Reject { at } | CallTransition::Miss { at } => {
                self.ended_at = Some(at)
            }
            CallTransition::End { at, duration } => {
                self.ended_at = Some(at);
                self.duration = duration;
            }
        }
    }
}

/// Data required to create a new call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCall {
    /// User placing the call.
    pub caller_id: UserId,
    /// User being called.
    pub receiver_id: UserId,
    /// Voice or video.
    pub call_type: CallType,
}
