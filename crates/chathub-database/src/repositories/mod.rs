//! PostgreSQL implementations of the storage traits.

pub mod call;
pub mod chat;
pub mod contact;
pub mod message;
pub mod user;

pub use call::CallRepository;
pub use chat::ChatRepository;
pub use contact::ContactRepository;
pub use message::MessageRepository;
pub use user::UserRepository;
