//! Pattern aggregation: many fact records in, per-table statistics out.
//!
//! Every per-table field is filled first-seen-first, so the order facts are
//! fed in determines which examples survive the caps. Within one fact,
//! tables are visited in sorted name order.

use std::collections::BTreeSet;

use loanlytics_core::{
  fact::{AggregateFunction, PredicateKind, ReportQueryFact},
  pattern::{JoinExample, TablePatterns},
};

/// Length cap for aggregation expressions stored in pattern statistics.
pub const EXPRESSION_LEN: usize = 50;

/// Incremental aggregator. Feed facts with [`Aggregator::add`] and take the
/// result with [`Aggregator::finish`].
#[derive(Debug, Default)]
pub struct Aggregator {
  patterns: TablePatterns,
  facts:    usize,
}

impl Aggregator {
  pub fn new() -> Self { Self::default() }

  /// Number of facts added so far.
  pub fn len(&self) -> usize { self.facts }

  pub fn is_empty(&self) -> bool { self.facts == 0 }

  pub fn add(&mut self, fact: &ReportQueryFact) {
    self.facts += 1;
    let tables = fact.table_names();

    // Relationships: every other table of the fact learns about each join.
    let mut related: BTreeSet<&str> = BTreeSet::new();
    for join in &fact.joins {
      for &table in tables.iter().filter(|&&t| t != join.table) {
        let stats = self.patterns.entry(table);
        stats.joins_with.insert(join.table.clone());
        stats.common_join_conditions.push(JoinExample {
          with_table:    join.table.clone(),
          condition:     join.condition.clone(),
          source_report: fact.report_name.clone(),
        });
        related.insert(table);
      }
    }
    for table in related {
      self.patterns.entry(table).usage_count += 1;
    }

    for aggregation in &fact.aggregations {
      let expression: String = aggregation
        .expression
        .to_lowercase()
        .chars()
        .take(EXPRESSION_LEN)
        .collect();
      for &table in &tables {
        let stats = self.patterns.entry(table);
        let column = match aggregation.function {
          AggregateFunction::Sum => &mut stats.sum_columns,
          AggregateFunction::Count => &mut stats.count_columns,
          AggregateFunction::Max => &mut stats.max_columns,
          _ => continue,
        };
        column.insert(expression.clone());
      }
    }

    for filter in &fact.filters {
      for &table in &tables {
        if filter.kind == PredicateKind::Equality {
          self
            .patterns
            .entry(table)
            .equality_filters
            .insert(filter.column.clone());
        } else if filter.column.contains("date") {
          self
            .patterns
            .entry(table)
            .date_filters
            .insert(filter.column.clone());
        } else if filter.kind.is_null_check() {
          self
            .patterns
            .entry(table)
            .null_check_filters
            .insert(filter.column.clone());
        }
      }
    }
  }

  pub fn finish(self) -> TablePatterns { self.patterns }
}

/// Aggregate `facts` in iteration order.
pub fn aggregate<'a>(
  facts: impl IntoIterator<Item = &'a ReportQueryFact>,
) -> TablePatterns {
  let mut aggregator = Aggregator::new();
  for fact in facts {
    aggregator.add(fact);
  }
  aggregator.finish()
}

#[cfg(test)]
mod tests {
  use loanlytics_core::fact::{
    Aggregation, FilterPredicate, JoinClause, JoinKind, TableRef,
  };

  use super::*;

  fn fact(name: &str, tables: &[&str], joins: &[(&str, &str)]) -> ReportQueryFact {
    let mut f = ReportQueryFact::empty(name);
    for t in tables {
      f.tables.insert(TableRef::new(*t, None));
    }
    for (table, condition) in joins {
      f.joins.push(JoinClause {
        kind:      JoinKind::Inner,
        table:     (*table).into(),
        alias:     None,
        condition: (*condition).into(),
      });
    }
    f
  }

  #[test]
  fn join_updates_every_other_table() {
    let f = fact("r1", &["a", "b", "c"], &[("c", "a.id = c.id")]);
    let patterns = aggregate([&f]);

    for source in ["a", "b"] {
      let stats = patterns.get(source).unwrap();
      assert!(stats.joins_with.contains("c"));
      assert_eq!(stats.usage_count, 1);
      let example = stats.common_join_conditions.first().unwrap();
      assert_eq!(example.with_table, "c");
      assert_eq!(example.source_report, "r1");
    }
    assert!(patterns.get("c").is_none());
  }

  #[test]
  fn usage_counts_once_per_fact() {
    let f = fact("r", &["a", "b", "c"], &[("b", "x"), ("c", "y")]);
    let patterns = aggregate([&f]);
    let a = patterns.get("a").unwrap();
    assert_eq!(a.usage_count, 1);
    assert_eq!(a.common_join_conditions.len(), 2);
    // `b` learns about the join to `c` and `c` about the join to `b`.
    assert_eq!(patterns.get("b").unwrap().usage_count, 1);
    assert_eq!(patterns.get("c").unwrap().usage_count, 1);
  }

  #[test]
  fn caps_keep_first_seen() {
    let facts: Vec<_> = (0..8)
      .map(|i| {
        let mut f = fact(&format!("r{i}"), &["a", "b"], &[("b", "a.id = b.id")]);
        f.aggregations.push(Aggregation {
          function:   AggregateFunction::Sum,
          expression: format!("SUM(A.COL_{i})"),
          alias:      None,
        });
        f.filters.push(FilterPredicate {
          column: format!("a.flag_{i}"),
          kind:   PredicateKind::IsNull,
        });
        f
      })
      .collect();

    let patterns = aggregate(&facts);
    let a = patterns.get("a").unwrap();
    assert_eq!(a.usage_count, 8);
    assert_eq!(a.common_join_conditions.len(), 5);
    assert_eq!(
      a.common_join_conditions
        .iter()
        .map(|c| c.source_report.as_str())
        .collect::<Vec<_>>(),
      vec!["r0", "r1", "r2", "r3", "r4"]
    );
    assert_eq!(a.sum_columns.as_slice(), &[
      "sum(a.col_0)",
      "sum(a.col_1)",
      "sum(a.col_2)",
      "sum(a.col_3)",
      "sum(a.col_4)",
    ]);
    assert_eq!(a.null_check_filters.len(), 3);
  }

  #[test]
  fn aggregation_expressions_are_truncated() {
    let mut f = fact("r", &["t"], &[]);
    f.aggregations.push(Aggregation {
      function:   AggregateFunction::Max,
      expression: format!("MAX({})", "X".repeat(80)),
      alias:      None,
    });
    f.aggregations.push(Aggregation {
      function:   AggregateFunction::Avg,
      expression: "AVG(y)".into(),
      alias:      None,
    });
    let patterns = aggregate([&f]);
    let t = patterns.get("t").unwrap();
    assert_eq!(t.max_columns.len(), 1);
    assert_eq!(t.max_columns.first().unwrap().chars().count(), EXPRESSION_LEN);
    assert!(t.sum_columns.is_empty() && t.count_columns.is_empty());
  }

  #[test]
  fn filters_route_to_first_matching_bucket() {
    let mut f = fact("r", &["t"], &[]);
    for (column, kind) in [
      ("t.due_date", PredicateKind::Equality),
      ("t.due_date", PredicateKind::Between),
      ("t.closed", PredicateKind::IsNotNull),
      ("t.amount", PredicateKind::GreaterThan),
    ] {
      f.filters.push(FilterPredicate {
        column: column.into(),
        kind,
      });
    }
    let patterns = aggregate([&f]);
    let t = patterns.get("t").unwrap();
    assert_eq!(t.equality_filters.as_slice(), &["t.due_date"]);
    assert_eq!(t.date_filters.as_slice(), &["t.due_date"]);
    assert_eq!(t.null_check_filters.as_slice(), &["t.closed"]);
  }

  #[test]
  fn merge_of_shards_matches_single_pass() {
    let facts = vec![
      fact("r1", &["a", "b"], &[("b", "a.id = b.id")]),
      fact("r2", &["a", "c"], &[("c", "a.id = c.id")]),
      fact("r3", &["b", "c", "d"], &[("d", "b.x = d.x")]),
      fact("r4", &["a", "d"], &[("d", "a.y = d.y")]),
    ];
    let whole = aggregate(&facts);
    let left = aggregate(&facts[..1]);
    let middle = aggregate(&facts[1..3]);
    let right = aggregate(&facts[3..]);

    let grouped_left = left.clone().merge(middle.clone()).merge(right.clone());
    let grouped_right = left.merge(middle.merge(right));

    for merged in [&grouped_left, &grouped_right] {
      assert_eq!(merged.len(), whole.len());
      for (table, stats) in whole.iter() {
        let other = merged.get(table).unwrap();
        assert_eq!(other.joins_with, stats.joins_with);
        assert_eq!(other.usage_count, stats.usage_count);
        assert_eq!(other.common_join_conditions, stats.common_join_conditions);
      }
    }
  }
}
