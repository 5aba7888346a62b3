//! Handlers for `/knowledge` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/knowledge` | Artifact overview; `ETag` is the artifact fingerprint |
//! | `GET`  | `/knowledge/tables/{table}` | Table hints, empty when unknown |
//! | `POST` | `/knowledge/enrich` | Body: `{"question":"..."}` |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use loanlytics_context::classify_intent;
use loanlytics_core::{artifact::IntentCategory, catalog::ReportCatalog};
use serde::{Deserialize, Serialize};

use crate::AppState;

// ─── Overview ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct KnowledgeOverview {
  pub available:   bool,
  pub tables:      usize,
  pub buckets:     BTreeMap<IntentCategory, usize>,
  pub rules:       Vec<String>,
  pub fingerprint: Option<String>,
}

/// `GET /knowledge`
pub async fn overview<C>(
  State(state): State<AppState<C>>,
  headers: HeaderMap,
) -> Response
where
  C: ReportCatalog,
{
  let context = state.knowledge.get();
  let etag = context.fingerprint().map(|fp| format!("\"{fp}\""));

  if let Some(etag) = &etag
    && headers
      .get(header::IF_NONE_MATCH)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|v| v == etag)
  {
    return StatusCode::NOT_MODIFIED.into_response();
  }

  let overview = match context.artifact() {
    Some(artifact) => KnowledgeOverview {
      available:   true,
      tables:      artifact.table_count(),
      buckets:     artifact
        .common_queries
        .iter()
        .map(|(category, bucket)| (*category, bucket.len()))
        .collect(),
      rules:       artifact.business_rules.keys().cloned().collect(),
      fingerprint: context.fingerprint().map(str::to_owned),
    },
    None => KnowledgeOverview {
      available:   false,
      tables:      0,
      buckets:     BTreeMap::new(),
      rules:       Vec::new(),
      fingerprint: None,
    },
  };

  let mut response = Json(overview).into_response();
  if let Some(etag) = etag
    && let Ok(value) = HeaderValue::from_str(&etag)
  {
    response.headers_mut().insert(header::ETAG, value);
  }
  response
}

// ─── Table context ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TableContext {
  pub table:   String,
  pub context: String,
}

/// `GET /knowledge/tables/{table}`
pub async fn table<C>(
  State(state): State<AppState<C>>,
  Path(table): Path<String>,
) -> Json<TableContext>
where
  C: ReportCatalog,
{
  let context = state.knowledge.get().context_for_table(&table);
  Json(TableContext { table, context })
}

// ─── Enrich ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EnrichBody {
  #[serde(default)]
  pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Enriched {
  pub enriched: String,
  pub intent:   Option<IntentCategory>,
}

/// `POST /knowledge/enrich`
pub async fn enrich<C>(
  State(state): State<AppState<C>>,
  Json(body): Json<EnrichBody>,
) -> Json<Enriched>
where
  C: ReportCatalog,
{
  let question = body.question.as_deref();
  let intent = question.and_then(classify_intent);
  tracing::debug!(?intent, "enriching question");
  Json(Enriched {
    enriched: state.knowledge.get().enrich(question),
    intent,
  })
}
