//! Error types for the loanlytics-mining crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error on {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to replace {path:?}: {source}")]
  Persist {
    path:   PathBuf,
    #[source]
    source: tempfile::PersistError,
  },

  #[error("artifact error: {0}")]
  Artifact(#[from] loanlytics_core::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
