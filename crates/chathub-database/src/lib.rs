//! # chathub-database
//!
//! The storage collaborator boundary. The real-time layer only talks to
//! the narrow traits in [`store`]; [`Storage`] bundles one implementation
//! of each, backed either by PostgreSQL repositories or by the in-memory
//! store used in development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod storage;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use storage::Storage;
pub use store::{CallStore, ChatStore, ContactStore, MessageStore, UserStore};
