//! Error type for `loanlytics-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// SQLite returned a negative row count.
  #[error("report count out of range: {0}")]
  CountOutOfRange(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
