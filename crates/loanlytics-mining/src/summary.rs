//! Per-run mining insights, written next to the artifact.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use loanlytics_core::fact::{AggregateFunction, ReportQueryFact};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOP_TABLES: usize = 30;
pub const TOP_TAGS: usize = 20;
pub const MOST_COMPLEX: usize = 5;

/// A report the pipeline could not analyze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedReport {
  pub id:     i64,
  pub name:   String,
  pub reason: String,
}

/// A name with an occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranked {
  pub name:  String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningSummary {
  pub run_id:            Uuid,
  pub generated_at:      DateTime<Utc>,
  pub rules_version:     u32,
  pub total_reports:     usize,
  pub analyzed_reports:  usize,
  pub skipped:           Vec<SkippedReport>,
  /// Tables by number of reports referencing them, most used first.
  pub most_used_tables:  Vec<Ranked>,
  pub aggregation_usage: BTreeMap<AggregateFunction, u64>,
  pub business_patterns: Vec<Ranked>,
  pub avg_joins:         f64,
  pub max_joins:         usize,
  /// Reports with the most joins, in descending order.
  pub most_complex:      Vec<Ranked>,
  /// Fingerprint of the artifact produced by the same run.
  pub fingerprint:       Option<String>,
}

/// Count occurrences, then rank by count descending and name ascending.
fn rank<'a>(names: impl Iterator<Item = &'a str>, limit: usize) -> Vec<Ranked> {
  let mut counts: HashMap<&str, u64> = HashMap::new();
  for name in names {
    *counts.entry(name).or_default() += 1;
  }
  let mut ranked: Vec<Ranked> = counts
    .into_iter()
    .map(|(name, count)| Ranked {
      name: name.to_owned(),
      count,
    })
    .collect();
  ranked
    .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
  ranked.truncate(limit);
  ranked
}

impl MiningSummary {
  /// Summarise one run. `facts` are the successfully analyzed reports.
  pub fn compute(
    total_reports: usize,
    facts: &[ReportQueryFact],
    skipped: Vec<SkippedReport>,
    rules_version: u32,
  ) -> Self {
    let most_used_tables = rank(
      facts.iter().flat_map(|f| f.table_names()),
      TOP_TABLES,
    );

    let mut aggregation_usage: BTreeMap<AggregateFunction, u64> =
      BTreeMap::new();
    for aggregation in facts.iter().flat_map(|f| &f.aggregations) {
      *aggregation_usage.entry(aggregation.function).or_default() += 1;
    }

    let business_patterns = rank(
      facts
        .iter()
        .flat_map(|f| f.business_tags.iter().map(String::as_str)),
      TOP_TAGS,
    );

    let join_counts: Vec<usize> = facts.iter().map(|f| f.joins.len()).collect();
    let avg_joins = if join_counts.is_empty() {
      0.0
    } else {
      join_counts.iter().sum::<usize>() as f64 / join_counts.len() as f64
    };
    let max_joins = join_counts.iter().copied().max().unwrap_or(0);

    // Stable sort keeps catalog order among reports with equal join counts.
    let mut by_joins: Vec<&ReportQueryFact> = facts.iter().collect();
    by_joins.sort_by(|a, b| b.joins.len().cmp(&a.joins.len()));
    let most_complex = by_joins
      .into_iter()
      .take(MOST_COMPLEX)
      .map(|f| Ranked {
        name:  f.report_name.clone(),
        count: f.joins.len() as u64,
      })
      .collect();

    Self {
      run_id: Uuid::new_v4(),
      generated_at: Utc::now(),
      rules_version,
      total_reports,
      analyzed_reports: facts.len(),
      skipped,
      most_used_tables,
      aggregation_usage,
      business_patterns,
      avg_joins,
      max_joins,
      most_complex,
      fingerprint: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use loanlytics_core::fact::{Aggregation, JoinClause, JoinKind, TableRef};

  use super::*;

  fn fact(name: &str, tables: &[&str], joins: usize) -> ReportQueryFact {
    let mut f = ReportQueryFact::empty(name);
    for t in tables {
      f.tables.insert(TableRef::new(*t, None));
      f.tables.insert(TableRef::new(*t, Some("x")));
    }
    for i in 0..joins {
      f.joins.push(JoinClause {
        kind:      JoinKind::Left,
        table:     format!("j{i}"),
        alias:     None,
        condition: String::new(),
      });
    }
    f
  }

  #[test]
  fn tables_ranked_by_report_count() {
    let facts = vec![
      fact("a", &["loans", "branches"], 1),
      fact("b", &["loans"], 0),
      fact("c", &["customers", "loans"], 3),
    ];
    let summary = MiningSummary::compute(4, &facts, Vec::new(), 1);
    let tables: Vec<_> = summary
      .most_used_tables
      .iter()
      .map(|r| (r.name.as_str(), r.count))
      .collect();
    assert_eq!(tables, vec![("loans", 3), ("branches", 1), ("customers", 1)]);
    assert_eq!(summary.analyzed_reports, 3);
    assert_eq!(summary.max_joins, 3);
    assert!((summary.avg_joins - 4.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.most_complex[0].name, "c");
    assert_eq!(summary.most_complex[1].name, "a");
  }

  #[test]
  fn aggregation_usage_and_tags() {
    let mut f = fact("a", &[], 0);
    for function in [AggregateFunction::Sum, AggregateFunction::Sum] {
      f.aggregations.push(Aggregation {
        function,
        expression: "SUM(x)".into(),
        alias: None,
      });
    }
    f.business_tags = vec!["Type: Loan Report".into(), "Scope: X".into()];
    let summary = MiningSummary::compute(1, &[f.clone(), f], Vec::new(), 1);
    assert_eq!(summary.aggregation_usage[&AggregateFunction::Sum], 4);
    assert_eq!(summary.business_patterns[0].count, 2);
  }

  #[test]
  fn empty_run_is_well_defined() {
    let summary = MiningSummary::compute(0, &[], Vec::new(), 1);
    assert_eq!(summary.avg_joins, 0.0);
    assert_eq!(summary.max_joins, 0);
    assert!(summary.most_complex.is_empty());
  }
}
