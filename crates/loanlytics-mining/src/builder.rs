//! Knowledge base builder.
//!
//! Splits aggregated [`TablePatterns`] into the artifact's three per-table
//! sections, classifies fact records into intent exemplar buckets and
//! attaches the curated business rules.

use std::collections::BTreeMap;

use loanlytics_core::{
  artifact::{
    AggregationPattern, BusinessRule, FilterPattern, IntentCategory,
    JoinSummary, KnowledgeArtifact, QueryExemplar, TableRelationship,
  },
  capped::Capped,
  fact::ReportQueryFact,
  pattern::TablePatterns,
};
use strum::IntoEnumIterator;

use crate::rules::curated_rules;

/// Bucket rules over the lower-cased report name. Non-exclusive: a report
/// lands in every bucket whose rule matches.
fn matches_bucket(category: IntentCategory, name: &str) -> bool {
  let has = |w: &str| name.contains(w);
  match category {
    IntentCategory::CustomerLoanAmount => {
      has("customer") && (has("outstanding") || has("loan"))
    }
    IntentCategory::ProductDisbursement => has("product") || has("disbursement"),
    IntentCategory::BranchCollection => has("branch") || has("collection"),
    IntentCategory::OutstandingReport => has("outstanding") || has("portfolio"),
    IntentCategory::ParNpaReport => has("par") || has("npa"),
  }
}

/// Every bucket `report_name` belongs to, in bucket order.
pub fn classify(report_name: &str) -> Vec<IntentCategory> {
  let name = report_name.to_lowercase();
  IntentCategory::iter()
    .filter(|c| matches_bucket(*c, &name))
    .collect()
}

/// The exemplar form of a fact record.
pub fn exemplar(fact: &ReportQueryFact) -> QueryExemplar {
  QueryExemplar {
    report:       fact.report_name.clone(),
    tables:       fact.table_names().into_iter().map(str::to_owned).collect(),
    first_join:   fact.joins.first().map(|j| JoinSummary {
      table:     j.table.clone(),
      condition: j.condition.clone(),
    }),
    aggregations: fact.aggregations.iter().map(|a| a.function).collect(),
  }
}

pub struct KnowledgeBuilder {
  rules: BTreeMap<String, BusinessRule>,
}

impl Default for KnowledgeBuilder {
  fn default() -> Self {
    Self {
      rules: curated_rules(),
    }
  }
}

impl KnowledgeBuilder {
  pub fn new() -> Self { Self::default() }

  /// Assemble the artifact. `facts` must be in the same order that was used
  /// for aggregation so exemplar buckets keep their first-seen reports.
  pub fn build(
    &self,
    patterns: &TablePatterns,
    facts: &[ReportQueryFact],
  ) -> KnowledgeArtifact {
    let mut artifact = KnowledgeArtifact {
      business_rules: self.rules.clone(),
      ..Default::default()
    };

    for (table, stats) in patterns.iter() {
      if !stats.joins_with.is_empty() || stats.usage_count > 0 {
        artifact.table_relationships.insert(table.clone(), TableRelationship {
          joins_with:             stats.joins_with.clone(),
          common_join_conditions: stats.common_join_conditions.clone(),
          usage_count:            stats.usage_count,
        });
      }

      if !(stats.sum_columns.is_empty()
        && stats.count_columns.is_empty()
        && stats.max_columns.is_empty())
      {
        artifact
          .aggregation_patterns
          .insert(table.clone(), AggregationPattern {
            sum_columns:   stats.sum_columns.clone(),
            count_columns: stats.count_columns.clone(),
            max_columns:   stats.max_columns.clone(),
          });
      }

      if !(stats.equality_filters.is_empty()
        && stats.date_filters.is_empty()
        && stats.null_check_filters.is_empty())
      {
        artifact.filter_patterns.insert(table.clone(), FilterPattern {
          common_equality_filters: stats.equality_filters.clone(),
          date_filters:            stats.date_filters.clone(),
          null_checks:             stats.null_check_filters.clone(),
        });
      }
    }

    for category in IntentCategory::iter() {
      artifact.common_queries.insert(category, Capped::new());
    }
    for fact in facts {
      for category in classify(&fact.report_name) {
        if let Some(bucket) = artifact.common_queries.get_mut(&category) {
          bucket.push(exemplar(fact));
        }
      }
    }

    artifact
  }
}
