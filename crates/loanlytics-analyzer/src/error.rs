//! Error types for the loanlytics-analyzer crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("query text is empty")]
  EmptyQuery,

  #[error("invalid extraction pattern {pattern:?}: {source}")]
  Pattern {
    pattern: &'static str,
    #[source]
    source:  regex::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
