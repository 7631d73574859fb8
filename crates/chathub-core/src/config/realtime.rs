//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound buffer per connection. A full buffer drops the event.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Maximum accepted inbound frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Seconds a call may ring before the watchdog marks it missed (0 disables).
    #[serde(default = "default_ring_timeout")]
    pub ring_timeout_seconds: u64,
    /// How often the ringing watchdog sweeps, in seconds.
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_seconds: u64,
    /// Only relay WebRTC signals between the two parties of a live call.
    #[serde(default = "default_true")]
    pub enforce_call_parties: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer_size: default_outbound_buffer(),
            max_frame_bytes: default_max_frame_bytes(),
            ring_timeout_seconds: default_ring_timeout(),
            watchdog_interval_seconds: default_watchdog_interval(),
            enforce_call_parties: true,
        }
    }
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    65_536
}

fn default_ring_timeout() -> u64 {
    45
}

fn default_watchdog_interval() -> u64 {
    5
}

fn default_true() -> bool {
    true
}
