//! A call together with the profiles of both parties.

use serde::{Deserialize, Serialize};

use crate::user::UserProfile;

use super::model::Call;

/// What clients receive for a call, over REST and in `call:*` events.
///
/// A party whose profile could not be loaded is `null`; the call columns
/// are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDetails {
    #[serde(flatten)]
    pub call: Call,
    pub caller: Option<UserProfile>,
    pub receiver: Option<UserProfile>,
}

impl CallDetails {
    /// A call with no profiles attached.
    pub fn bare(call: Call) -> Self {
        Self {
            call,
            caller: None,
            receiver: None,
        }
    }
}
