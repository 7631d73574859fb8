//! Shared value types.

pub mod id;

pub use id::{CallId, ChatId, ConnectionId, ContactId, MessageId, UserId};
