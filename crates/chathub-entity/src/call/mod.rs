//! Call domain entities and the call lifecycle.

pub mod details;
pub mod model;
pub mod status;
pub mod transition;

pub use details::CallDetails;
pub use model::{Call, NewCall};
pub use status::{CallStatus, CallType};
pub use transition::CallTransition;
