//! ICE server credentials for WebRTC clients.

pub mod service;

pub use service::{IceServer, IceServers, TurnService};
