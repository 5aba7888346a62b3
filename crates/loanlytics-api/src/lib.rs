//! JSON HTTP API for Loanlytics.
//!
//! Exposes an axum [`Router`] backed by any [`ReportCatalog`] and a shared
//! [`KnowledgeHandle`]. Auth and TLS are the caller's responsibility.

pub mod error;
pub mod knowledge;
pub mod reports;
pub mod sql;

use std::{collections::BTreeMap, sync::Arc};

use axum::{
  Json, Router,
  routing::{get, post},
};
use loanlytics_analyzer::RegexAnalyzer;
use loanlytics_context::KnowledgeHandle;
use loanlytics_core::catalog::ReportCatalog;
use loanlytics_query::{
  AgentInterpreter, ReadOnlyGuard, SchemaRepair, TemplateMatcher,
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, SetupError};

// ─── Application state ───────────────────────────────────────────────────────

/// Compiled, stateless query helpers shared by every request.
pub struct QueryTools {
  pub analyzer:    RegexAnalyzer,
  pub repair:      SchemaRepair,
  pub guard:       ReadOnlyGuard,
  pub templates:   TemplateMatcher,
  pub interpreter: AgentInterpreter,
}

impl QueryTools {
  /// Build the helpers, repairing schema prefixes with `schema_map`
  /// (table → schema).
  pub fn new(schema_map: BTreeMap<String, String>) -> Result<Self, SetupError> {
    Ok(Self {
      analyzer:    RegexAnalyzer::new()?,
      repair:      SchemaRepair::new(schema_map)?,
      guard:       ReadOnlyGuard::new()?,
      templates:   TemplateMatcher::new()?,
      interpreter: AgentInterpreter::new()?,
    })
  }
}

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<C> {
  pub catalog:   Arc<C>,
  pub knowledge: Arc<KnowledgeHandle>,
  pub tools:     Arc<QueryTools>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router.
pub fn router<C>(state: AppState<C>) -> Router
where
  C: ReportCatalog + Clone + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Knowledge
    .route("/knowledge", get(knowledge::overview::<C>))
    .route("/knowledge/tables/{table}", get(knowledge::table::<C>))
    .route("/knowledge/enrich", post(knowledge::enrich::<C>))
    // SQL
    .route("/sql/repair", post(sql::repair::<C>))
    .route("/sql/check", post(sql::check::<C>))
    .route("/sql/template", post(sql::template::<C>))
    .route("/agent/interpret", post(sql::interpret::<C>))
    // Reports
    .route("/reports", get(reports::list::<C>))
    .route("/reports/{id}/analysis", get(reports::analysis::<C>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "healthy" })) }
