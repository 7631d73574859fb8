//! Conversation message fan-out.

pub mod engine;
