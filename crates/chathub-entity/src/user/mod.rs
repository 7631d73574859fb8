//! User domain entities.

pub mod model;

pub use model::{UserProfile, UserSummary};
