//! WebRTC signal forwarding.

pub mod signal;
