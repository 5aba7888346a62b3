//! Per-table pattern statistics accumulated over many fact records.
//!
//! [`TablePatterns`] is the output of the mining aggregator. Each entry is
//! keyed by the lower-cased qualified table name. Every bounded field is a
//! [`Capped`] container, so once a field is full later discoveries are
//! dropped.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::capped::Capped;

pub const JOIN_CONDITION_CAP: usize = 5;
pub const AGGREGATE_COLUMN_CAP: usize = 5;
pub const EQUALITY_FILTER_CAP: usize = 5;
pub const DATE_FILTER_CAP: usize = 5;
pub const NULL_CHECK_CAP: usize = 3;

/// A join condition observed between two tables in some report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinExample {
  #[serde(rename = "with")]
  pub with_table:    String,
  pub condition:     String,
  #[serde(rename = "report")]
  pub source_report: String,
}

/// Everything learned about one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePatternStats {
  /// Tables ever joined with this one.
  pub joins_with:             BTreeSet<String>,
  /// First-seen join conditions, in processing order.
  pub common_join_conditions: Capped<JoinExample, JOIN_CONDITION_CAP>,
  pub sum_columns:            Capped<String, AGGREGATE_COLUMN_CAP>,
  pub count_columns:          Capped<String, AGGREGATE_COLUMN_CAP>,
  pub max_columns:            Capped<String, AGGREGATE_COLUMN_CAP>,
  pub equality_filters:       Capped<String, EQUALITY_FILTER_CAP>,
  pub date_filters:           Capped<String, DATE_FILTER_CAP>,
  pub null_check_filters:     Capped<String, NULL_CHECK_CAP>,
  /// Number of fact records in which this table took part in a join.
  pub usage_count:            u64,
}

impl TablePatternStats {
  /// Fold `other` into `self`.
  ///
  /// Set fields are unioned and counters summed, so those commute. Ordered
  /// fields append `other` after `self` until full; callers merging shards
  /// must do so in report-id order to reproduce a single-pass result.
  pub fn merge(&mut self, other: TablePatternStats) {
    self.joins_with.extend(other.joins_with);
    self.common_join_conditions.append(other.common_join_conditions);
    self.sum_columns.union(other.sum_columns);
    self.count_columns.union(other.count_columns);
    self.max_columns.union(other.max_columns);
    self.equality_filters.union(other.equality_filters);
    self.date_filters.union(other.date_filters);
    self.null_check_filters.union(other.null_check_filters);
    self.usage_count += other.usage_count;
  }
}

/// Pattern statistics for every table seen by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TablePatterns {
  tables: BTreeMap<String, TablePatternStats>,
}

impl TablePatterns {
  pub fn new() -> Self { Self::default() }

  /// Mutable stats for `table`, created empty on first access.
  pub fn entry(&mut self, table: &str) -> &mut TablePatternStats {
    self.tables.entry(table.to_owned()).or_default()
  }

  pub fn get(&self, table: &str) -> Option<&TablePatternStats> {
    self.tables.get(table)
  }

  pub fn len(&self) -> usize { self.tables.len() }

  pub fn is_empty(&self) -> bool { self.tables.is_empty() }

  pub fn iter(
    &self,
  ) -> std::collections::btree_map::Iter<'_, String, TablePatternStats> {
    self.tables.iter()
  }

  /// Merge another aggregation into this one. See
  /// [`TablePatternStats::merge`] for ordering guarantees.
  pub fn merge(mut self, other: TablePatterns) -> TablePatterns {
    for (table, stats) in other.tables {
      self.entry(&table).merge(stats);
    }
    self
  }
}

impl FromIterator<(String, TablePatternStats)> for TablePatterns {
  fn from_iter<I: IntoIterator<Item = (String, TablePatternStats)>>(
    iter: I,
  ) -> Self {
    Self {
      tables: iter.into_iter().collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn example(with: &str, report: &str) -> JoinExample {
    JoinExample {
      with_table:    with.into(),
      condition:     format!("a.id = {with}.id"),
      source_report: report.into(),
    }
  }

  #[test]
  fn merge_unions_sets_and_sums_usage() {
    let mut left = TablePatternStats::default();
    left.joins_with.insert("branch_master".into());
    left.usage_count = 2;
    left.sum_columns.insert("sum(x)".into());

    let mut right = TablePatternStats::default();
    right.joins_with.insert("branch_master".into());
    right.joins_with.insert("customer".into());
    right.usage_count = 3;
    right.sum_columns.insert("sum(x)".into());
    right.sum_columns.insert("sum(y)".into());

    left.merge(right);
    assert_eq!(left.joins_with.len(), 2);
    assert_eq!(left.usage_count, 5);
    assert_eq!(left.sum_columns.as_slice(), &["sum(x)", "sum(y)"]);
  }

  #[test]
  fn merge_respects_condition_cap() {
    let mut left = TablePatternStats::default();
    for i in 0..4 {
      left.common_join_conditions.push(example("t", &format!("l{i}")));
    }
    let mut right = TablePatternStats::default();
    for i in 0..4 {
      right.common_join_conditions.push(example("t", &format!("r{i}")));
    }
    left.merge(right);
    let reports: Vec<_> = left
      .common_join_conditions
      .iter()
      .map(|c| c.source_report.as_str())
      .collect();
    assert_eq!(reports, vec!["l0", "l1", "l2", "l3", "r0"]);
  }

  #[test]
  fn join_example_uses_short_keys() {
    let json = serde_json::to_value(example("customer", "Rep")).unwrap();
    assert_eq!(json["with"], "customer");
    assert_eq!(json["report"], "Rep");
  }
}
