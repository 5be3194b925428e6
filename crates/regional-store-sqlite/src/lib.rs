//! SQLite backend for the regional store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Reconciliation transactions execute
//! entirely on that thread, so a transaction can never be interrupted
//! halfway by a dropped future.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
