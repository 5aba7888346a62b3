//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports` | Reports with SQL, ordered by id |
//! | `GET`  | `/reports/{id}/analysis` | 404 if not found, 400 if it has no SQL |

use axum::{
  Json,
  extract::{Path, State},
};
use loanlytics_core::{
  catalog::ReportCatalog,
  fact::ReportQueryFact,
  report::ReportRecord,
};

use crate::{AppState, error::ApiError};

/// `GET /reports`
pub async fn list<C>(
  State(state): State<AppState<C>>,
) -> Result<Json<Vec<ReportRecord>>, ApiError>
where
  C: ReportCatalog,
{
  let reports = state
    .catalog
    .list_reports()
    .await
    .map_err(|e| ApiError::Catalog(Box::new(e)))?;
  Ok(Json(reports))
}

/// `GET /reports/{id}/analysis`
pub async fn analysis<C>(
  State(state): State<AppState<C>>,
  Path(id): Path<i64>,
) -> Result<Json<ReportQueryFact>, ApiError>
where
  C: ReportCatalog,
{
  let report = state
    .catalog
    .get_report(id)
    .await
    .map_err(|e| ApiError::Catalog(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("report {id} not found")))?;

  let sql = report
    .query()
    .ok_or_else(|| ApiError::BadRequest(format!("report {id} has no query")))?;

  let fact = state
    .tools
    .analyzer
    .analyze(&report.name, sql)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  Ok(Json(fact))
}
