//! Connection handles, the registry, and handshake authentication.

pub mod authenticator;
pub mod handle;
pub mod registry;
