//! # chathub-api
//!
//! HTTP API layer for ChatHub built on Axum.
//!
//! Provides the call-control REST endpoints, TURN credentials, health
//! checks, the WebSocket upgrade, middleware (CORS, logging), the bearer
//! token extractor, DTOs, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server, serve};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
