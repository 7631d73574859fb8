//! Event-name to handler-kind table, built once per engine.

use std::collections::HashMap;

use crate::message::types::SignalKind;

/// Every inbound event the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `message:send`
    SendMessage,
    /// `message:read`
    MessageRead,
    /// `typing:start`
    TypingStart,
    /// `typing:stop`
    TypingStop,
    /// `webrtc:offer`, `webrtc:answer`, `webrtc:ice`
    Signal(SignalKind),
    /// `ping`
    Ping,
}

/// Lookup table from wire event name to [`EventKind`].
#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: HashMap<&'static str, EventKind>,
}

impl DispatchTable {
    /// Builds the table of supported inbound events.
    pub fn new() -> Self {
        let signals = [SignalKind::Offer, SignalKind::Answer, SignalKind::Ice];
        let mut routes: HashMap<&'static str, EventKind> = HashMap::from([
            ("message:send", EventKind::SendMessage),
            ("message:read", EventKind::MessageRead),
            ("typing:start", EventKind::TypingStart),
            ("typing:stop", EventKind::TypingStop),
            ("ping", EventKind::Ping),
        ]);
        routes.extend(
            signals
                .into_iter()
                .map(|kind| (kind.event_name(), EventKind::Signal(kind))),
        );
        Self { routes }
    }

    /// Resolves an event name.
    pub fn resolve(&self, event: &str) -> Option<EventKind> {
        self.routes.get(event).copied()
    }

    /// Number of routed events.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}
