//! Online/offline presence.

pub mod broadcaster;
