//! Custom Axum extractors.

pub mod auth;
pub mod body;

pub use auth::{AuthUser, bearer_token};
pub use body::{ApiJson, ApiPath};
