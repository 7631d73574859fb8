//! # chathub-service
//!
//! Business logic service layer for ChatHub. Each service orchestrates the
//! storage traits and the connection registry to implement one use case.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod call;
pub mod turn;

pub use call::{CallService, CallWatchdog};
pub use turn::{IceServer, IceServers, TurnService};
