//! API error types and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The read-only guard refused the query.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("catalog error: {0}")]
  Catalog(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Catalog(e) => {
        tracing::error!("catalog error: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

/// Failure to build the shared query tooling.
#[derive(Debug, Error)]
pub enum SetupError {
  #[error(transparent)]
  Analyzer(#[from] loanlytics_analyzer::Error),

  #[error(transparent)]
  Query(#[from] loanlytics_query::Error),
}
