//! Contact domain entities.

pub mod model;

pub use model::Contact;
