//! Wire frames, typed payloads, outbound event builders and validation.

pub mod builder;
pub mod types;
pub mod validator;
