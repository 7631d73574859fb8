//! # chathub-auth
//!
//! The identity verifier the real-time layer consults before registering
//! a connection. Tokens are HS256 JWTs carrying the user id; verification
//! also confirms the user still exists in storage.

pub mod jwt;
pub mod verifier;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use verifier::JwtIdentityVerifier;
