//! The `ReportCatalog` trait.
//!
//! Implemented by storage backends (e.g. `loanlytics-store-sqlite`). The
//! mining pipeline and the HTTP layer depend on this abstraction only.

use std::future::Future;

use crate::report::ReportRecord;

/// A source of historical report definitions.
///
/// All methods return `Send` futures so the trait can be used from axum
/// handlers on a multi-threaded runtime.
pub trait ReportCatalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every report with a non-empty query text, ordered by id.
  fn list_reports(
    &self,
  ) -> impl Future<Output = Result<Vec<ReportRecord>, Self::Error>> + Send + '_;

  /// Retrieve one report by id. Returns `None` if not found.
  fn get_report(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<ReportRecord>, Self::Error>> + Send + '_;

  /// Insert or replace a report.
  fn put_report(
    &self,
    report: ReportRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Total number of stored reports, including those without a query.
  fn count_reports(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
