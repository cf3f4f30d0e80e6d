//! SQLite backend for the ActivFlow activity store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Soft-deleted rows are hidden behind
//! the `live_*` views of the schema; reads go through those views.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
