//! # chathub-realtime
//!
//! The real-time layer of ChatHub:
//!
//! - Connection registry (one live connection per user)
//! - Presence broadcasting to the users who keep someone as a contact
//! - Message fan-out to every live participant of a conversation
//! - WebRTC signal relay between the two parties of a call
//! - The inbound event dispatch table used by every connection

pub mod connection;
pub mod fanout;
pub mod gateway;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod relay;
pub mod server;

pub use connection::handle::ConnectionHandle;
pub use connection::registry::ConnectionRegistry;
pub use fanout::engine::FanoutEngine;
pub use gateway::Gateway;
pub use message::types::OutboundEvent;
pub use presence::broadcaster::PresenceBroadcaster;
pub use relay::signal::SignalRelay;
pub use server::RealtimeEngine;
