//! Error types for the loanlytics-query crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid pattern {pattern:?}: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source:  regex::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn compile(pattern: &str) -> Result<regex::Regex> {
  regex::Regex::new(pattern).map_err(|source| Error::Pattern {
    pattern: pattern.to_owned(),
    source,
  })
}
