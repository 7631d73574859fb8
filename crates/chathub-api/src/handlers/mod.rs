//! Route handlers organized by domain.

pub mod call;
pub mod health;
pub mod turn;
pub mod ws;
