//! Report records as supplied by a report catalog.

use serde::{Deserialize, Serialize};

/// A named SQL report definition. The JSON form matches the catalog export
/// format: `{"id", "report_name", "query"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
  pub id:         i64,
  #[serde(rename = "report_name", alias = "name")]
  pub name:       String,
  /// Raw SQL text. Exports may carry `null` for reports without a query.
  #[serde(rename = "query", default)]
  pub query_text: Option<String>,
}

impl ReportRecord {
  pub fn new(
    id: i64,
    name: impl Into<String>,
    query_text: impl Into<String>,
  ) -> Self {
    Self {
      id,
      name: name.into(),
      query_text: Some(query_text.into()),
    }
  }

  /// The query text, if present and not blank.
  pub fn query(&self) -> Option<&str> {
    self
      .query_text
      .as_deref()
      .filter(|q| !q.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_catalog_export_shape() {
    let json = r#"[
      {"id": 7, "report_name": "Branch Collection", "query": "SELECT 1"},
      {"id": 8, "report_name": "Empty", "query": null},
      {"id": 9, "report_name": "Missing"}
    ]"#;
    let records: Vec<ReportRecord> = serde_json::from_str(json).unwrap();
    assert_eq!(records[0].query(), Some("SELECT 1"));
    assert_eq!(records[1].query(), None);
    assert_eq!(records[2].query(), None);
  }

  #[test]
  fn blank_query_counts_as_absent() {
    let r = ReportRecord::new(1, "r", "   \n");
    assert_eq!(r.query(), None);
  }
}
