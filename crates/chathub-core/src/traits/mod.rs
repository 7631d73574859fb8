//! Collaborator traits implemented outside the core.

pub mod identity;

pub use identity::{IdentityVerifier, VerifiedIdentity};
