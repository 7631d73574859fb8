//! Chat message domain entities.

pub mod details;
pub mod kind;
pub mod model;

pub use details::{MessageDetails, ReplyPreview};
pub use kind::MessageKind;
pub use model::{Message, NewMessage};
