//! SQLite backend for the report catalog.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod catalog;
mod schema;

pub mod error;

pub use catalog::SqliteCatalog;
pub use error::{Error, Result};
