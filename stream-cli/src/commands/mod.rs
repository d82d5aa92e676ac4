//! CLI command implementations.

pub mod chat;
pub mod health;
pub mod tail;
