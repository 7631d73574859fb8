//! # chathub-entity
//!
//! Domain entity models for ChatHub. Every struct in this crate represents
//! a database table row or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, `Deserialize`, and database entities
//! additionally derive `sqlx::FromRow`.
//!
//! Wire-facing rows serialize with camelCase keys, which is what the
//! browser client reads.

pub mod call;
pub mod chat;
pub mod contact;
pub mod message;
pub mod user;
