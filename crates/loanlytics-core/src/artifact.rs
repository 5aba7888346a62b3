//! The persisted knowledge artifact.
//!
//! A [`KnowledgeArtifact`] is built offline by the mining pipeline and loaded
//! read-only at serve time. Every top-level section defaults to empty when
//! absent, so artifacts written by older builds still load.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  Result,
  capped::Capped,
  fact::AggregateFunction,
  pattern::{
    AGGREGATE_COLUMN_CAP, DATE_FILTER_CAP, EQUALITY_FILTER_CAP,
    JOIN_CONDITION_CAP, JoinExample, NULL_CHECK_CAP,
  },
};

/// Maximum number of exemplars kept per intent bucket.
pub const EXEMPLAR_CAP: usize = 5;

// ─── Per-table sections ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRelationship {
  #[serde(default)]
  pub joins_with:             BTreeSet<String>,
  #[serde(default)]
  pub common_join_conditions: Capped<JoinExample, JOIN_CONDITION_CAP>,
  #[serde(default)]
  pub usage_count:            u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPattern {
  #[serde(default)]
  pub sum_columns:   Capped<String, AGGREGATE_COLUMN_CAP>,
  #[serde(default)]
  pub count_columns: Capped<String, AGGREGATE_COLUMN_CAP>,
  #[serde(default)]
  pub max_columns:   Capped<String, AGGREGATE_COLUMN_CAP>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPattern {
  #[serde(default)]
  pub common_equality_filters: Capped<String, EQUALITY_FILTER_CAP>,
  #[serde(default)]
  pub date_filters:            Capped<String, DATE_FILTER_CAP>,
  #[serde(default)]
  pub null_checks:             Capped<String, NULL_CHECK_CAP>,
}

// ─── Exemplars ───────────────────────────────────────────────────────────────

/// The question-intent buckets exemplars are classified into.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentCategory {
  CustomerLoanAmount,
  ProductDisbursement,
  BranchCollection,
  OutstandingReport,
  ParNpaReport,
}

/// The first join of an exemplar report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSummary {
  pub table:     String,
  pub condition: String,
}

/// A historical report shown to the agent as a "similar report".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExemplar {
  pub report:       String,
  /// Distinct table names, sorted.
  #[serde(default)]
  pub tables:       Vec<String>,
  #[serde(default)]
  pub first_join:   Option<JoinSummary>,
  /// Aggregate functions in the order they appear in the query.
  #[serde(default)]
  pub aggregations: Vec<AggregateFunction>,
}

// ─── Business rules ──────────────────────────────────────────────────────────

/// A hand-curated statement about the schema. Never derived from mining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRule {
  pub description:       String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub tables:            Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub key_columns:       Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub key_relationships: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub common_patterns:   Vec<String>,
  #[serde(rename = "usage", alias = "usage_note", default)]
  pub usage_note:        String,
}

// ─── Artifact ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeArtifact {
  #[serde(default)]
  pub table_relationships:  BTreeMap<String, TableRelationship>,
  #[serde(default)]
  pub aggregation_patterns: BTreeMap<String, AggregationPattern>,
  #[serde(default)]
  pub filter_patterns:      BTreeMap<String, FilterPattern>,
  #[serde(default)]
  pub common_queries:
    BTreeMap<IntentCategory, Capped<QueryExemplar, EXEMPLAR_CAP>>,
  #[serde(default)]
  pub business_rules:       BTreeMap<String, BusinessRule>,
}

impl KnowledgeArtifact {
  pub fn from_slice(bytes: &[u8]) -> Result<Self> {
    Ok(serde_json::from_slice(bytes)?)
  }

  /// Pretty JSON. Maps serialise with sorted keys, so equal artifacts
  /// produce identical bytes.
  pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(self)?)
  }

  /// Exemplars of `category` in insertion order; empty if the bucket is
  /// missing.
  pub fn exemplars(&self, category: IntentCategory) -> &[QueryExemplar] {
    self
      .common_queries
      .get(&category)
      .map(Capped::as_slice)
      .unwrap_or_default()
  }

  /// Number of distinct tables that appear in any per-table section.
  pub fn table_count(&self) -> usize {
    self
      .table_relationships
      .keys()
      .chain(self.aggregation_patterns.keys())
      .chain(self.filter_patterns.keys())
      .collect::<BTreeSet<_>>()
      .len()
  }
}
