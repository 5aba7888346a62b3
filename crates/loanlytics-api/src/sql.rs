//! Handlers for `/sql` and `/agent` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sql/repair` | Body: `{"sql":"..."}` |
//! | `POST` | `/sql/check` | 403 when the guard refuses the query |
//! | `POST` | `/sql/template` | 404 when no template matches |
//! | `POST` | `/agent/interpret` | Body: agent output and intermediate steps |

use axum::{Json, extract::State};
use loanlytics_core::catalog::ReportCatalog;
use loanlytics_query::{AgentOutcome, Interpretation, template::TemplateKind};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SqlBody {
  pub sql: String,
}

#[derive(Debug, Serialize)]
pub struct Repaired {
  pub sql:     String,
  pub changed: bool,
}

/// `POST /sql/repair`
pub async fn repair<C>(
  State(state): State<AppState<C>>,
  Json(body): Json<SqlBody>,
) -> Json<Repaired>
where
  C: ReportCatalog,
{
  let repaired = state.tools.repair.repair(&body.sql);
  let changed = repaired != body.sql.as_str();
  Json(Repaired {
    sql: repaired.into_owned(),
    changed,
  })
}

#[derive(Debug, Serialize)]
pub struct Verdict {
  pub allowed: bool,
  pub sql:     String,
  pub changed: bool,
}

/// `POST /sql/check`. The query is repaired first, then checked.
pub async fn check<C>(
  State(state): State<AppState<C>>,
  Json(body): Json<SqlBody>,
) -> Result<Json<Verdict>, ApiError>
where
  C: ReportCatalog,
{
  let repaired = state.tools.repair.repair(&body.sql);
  let changed = repaired != body.sql.as_str();
  state.tools.guard.check(&repaired).map_err(|rejection| {
    tracing::debug!(%rejection, "query rejected");
    ApiError::Forbidden(rejection.to_string())
  })?;
  Ok(Json(Verdict {
    allowed: true,
    sql: repaired.into_owned(),
    changed,
  }))
}

#[derive(Debug, Deserialize)]
pub struct QuestionBody {
  pub question: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateMatch {
  pub template: TemplateKind,
  pub sql:      String,
}

/// `POST /sql/template`
pub async fn template<C>(
  State(state): State<AppState<C>>,
  Json(body): Json<QuestionBody>,
) -> Result<Json<TemplateMatch>, ApiError>
where
  C: ReportCatalog,
{
  let found = state.tools.templates.find(&body.question).ok_or_else(|| {
    ApiError::NotFound("no template matches this question".to_owned())
  })?;
  Ok(Json(TemplateMatch {
    template: found.name,
    sql:      found.sql,
  }))
}

/// `POST /agent/interpret`
pub async fn interpret<C>(
  State(state): State<AppState<C>>,
  Json(outcome): Json<AgentOutcome>,
) -> Json<Interpretation>
where
  C: ReportCatalog,
{
  tracing::debug!(steps = outcome.steps.len(), "interpreting agent outcome");
  Json(state.tools.interpreter.interpret(&outcome, &state.tools.repair))
}
