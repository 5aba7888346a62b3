//! The `QueryAnalyzer` trait.
//!
//! The bundled implementation is regex-based (`loanlytics-analyzer`); a real
//! SQL parser can be substituted without touching the aggregator or builder.

use crate::fact::ReportQueryFact;

/// Turns one report's SQL text into a [`ReportQueryFact`].
///
/// Implementations must be deterministic: the same `(report_name, sql)` pair
/// always yields an identical record. Fields the analyzer cannot extract are
/// left empty rather than failing the whole record.
pub trait QueryAnalyzer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn analyze(
    &self,
    report_name: &str,
    sql: &str,
  ) -> Result<ReportQueryFact, Self::Error>;
}
