//! Durable persistence of per-pair watcher state.

pub mod error;
pub mod sqlite;
pub mod traits;
