//! Fact records: the structural extraction result for one report query.
//!
//! A [`ReportQueryFact`] is produced once by a
//! [`QueryAnalyzer`](crate::analyzer::QueryAnalyzer) and never updated
//! afterwards. Re-analysing the same text must yield an identical record, so
//! every collection below has a deterministic order: sets are `BTreeSet`s and
//! sequences keep the order in which the analyzer found their elements.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Tables ──────────────────────────────────────────────────────────────────

/// A table mentioned in a `FROM` or `JOIN` clause.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TableRef {
  /// Lower-cased `schema.table` or bare `table`.
  pub name:  String,
  pub alias: Option<String>,
}

impl TableRef {
  pub fn new(name: impl Into<String>, alias: Option<&str>) -> Self {
    Self {
      name:  name.into(),
      alias: alias.map(str::to_owned),
    }
  }
}

// ─── Joins ───────────────────────────────────────────────────────────────────

/// The flavour of a `JOIN`. Plain and `CROSS` joins are recorded as
/// [`JoinKind::Inner`]; `FULL` and bare `OUTER` joins as [`JoinKind::Outer`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JoinKind {
  #[default]
  Inner,
  Left,
  Right,
  Outer,
}

/// One `<kind> JOIN <table> [alias] ON <condition>` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
  #[serde(rename = "type")]
  pub kind:      JoinKind,
  /// Lower-cased joined table name.
  pub table:     String,
  pub alias:     Option<String>,
  /// Raw condition text, truncated to a fixed length.
  pub condition: String,
}

// ─── Projection ──────────────────────────────────────────────────────────────

/// One top-level expression of the `SELECT` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectColumn {
  /// Raw expression text, truncated to a fixed length.
  pub expression: String,
  /// Trailing alias or column if present, otherwise the leading name of the
  /// expression; always lower-case.
  pub name:       String,
}

// ─── Aggregations ────────────────────────────────────────────────────────────

/// The aggregate functions the analyzer recognises.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AggregateFunction {
  Sum,
  Count,
  Avg,
  Max,
  Min,
  GroupConcat,
}

/// A call to one of the [`AggregateFunction`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
  pub function:   AggregateFunction,
  /// The full call text, e.g. `SUM(r.principal_magnitude)`.
  pub expression: String,
  /// Lower-cased `AS` alias following the call, if any.
  pub alias:      Option<String>,
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// The textual predicate shapes recognised in a `WHERE` clause.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PredicateKind {
  Equality,
  InList,
  Like,
  Between,
  IsNull,
  IsNotNull,
  GreaterThan,
  LessThan,
}

impl PredicateKind {
  /// `IS NULL` or `IS NOT NULL`.
  pub fn is_null_check(self) -> bool {
    matches!(self, Self::IsNull | Self::IsNotNull)
  }
}

/// A column constrained by a `WHERE` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
  /// Lower-cased column reference, possibly alias-qualified.
  pub column: String,
  #[serde(rename = "type")]
  pub kind:   PredicateKind,
}

// ─── ReportQueryFact ─────────────────────────────────────────────────────────

/// Everything the analyzer learned about one report's SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQueryFact {
  pub report_name:   String,
  pub tables:        BTreeSet<TableRef>,
  pub joins:         Vec<JoinClause>,
  pub columns:       Vec<SelectColumn>,
  pub aggregations:  Vec<Aggregation>,
  pub filters:       Vec<FilterPredicate>,
  pub group_by:      Vec<String>,
  pub order_by:      Vec<String>,
  /// Inferred labels such as `"Type: Loan Report"`. Order-sensitive; may
  /// contain duplicates.
  #[serde(rename = "business_logic", alias = "business_tags")]
  pub business_tags: Vec<String>,
}

impl ReportQueryFact {
  /// An empty record for `report_name`; every field is empty.
  pub fn empty(report_name: impl Into<String>) -> Self {
    Self {
      report_name:   report_name.into(),
      tables:        BTreeSet::new(),
      joins:         Vec::new(),
      columns:       Vec::new(),
      aggregations:  Vec::new(),
      filters:       Vec::new(),
      group_by:      Vec::new(),
      order_by:      Vec::new(),
      business_tags: Vec::new(),
    }
  }

  /// Distinct table names in sorted order. A table referenced under two
  /// aliases appears once.
  pub fn table_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> =
      self.tables.iter().map(|t| t.name.as_str()).collect();
    names.dedup();
    names
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_names_collapse_aliases() {
    let mut fact = ReportQueryFact::empty("r");
    fact.tables.insert(TableRef::new("customer", Some("c")));
    fact.tables.insert(TableRef::new("customer", Some("c2")));
    fact.tables.insert(TableRef::new("branch_master", None));
    assert_eq!(fact.table_names(), vec!["branch_master", "customer"]);
  }

  #[test]
  fn aggregate_function_round_trips_keyword() {
    let f: AggregateFunction = "group_concat".parse().unwrap();
    assert_eq!(f, AggregateFunction::GroupConcat);
    assert_eq!(f.to_string(), "GROUP_CONCAT");
    assert_eq!(
      serde_json::to_value(AggregateFunction::Sum).unwrap(),
      serde_json::json!("SUM")
    );
  }

  #[test]
  fn predicate_kind_serialises_snake_case() {
    assert_eq!(
      serde_json::to_value(PredicateKind::IsNotNull).unwrap(),
      serde_json::json!("is_not_null")
    );
    assert!(PredicateKind::IsNull.is_null_check());
    assert!(!PredicateKind::Like.is_null_check());
  }

  #[test]
  fn tags_serialise_under_business_logic_key() {
    let mut fact = ReportQueryFact::empty("r");
    fact.business_tags.push("Type: Loan Report".into());
    let json = serde_json::to_value(&fact).unwrap();
    assert_eq!(json["business_logic"][0], "Type: Loan Report");
    let back: ReportQueryFact = serde_json::from_value(json).unwrap();
    assert_eq!(back, fact);
  }
}
