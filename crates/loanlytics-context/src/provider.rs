//! Query-time knowledge lookups.
//!
//! [`KnowledgeContext`] is immutable once built. When the artifact could not
//! be loaded it is *unavailable*, and every lookup returns empty output.

use std::path::Path;

use loanlytics_core::artifact::{
  IntentCategory, KnowledgeArtifact, QueryExemplar,
};

const MAX_JOIN_PARTNERS: usize = 5;
const MAX_SUM_COLUMNS: usize = 3;
const MAX_FILTERS: usize = 3;
const MAX_EXEMPLAR_TABLES: usize = 5;
const MAX_EXEMPLAR_AGGREGATIONS: usize = 3;
const CONDITION_LEN: usize = 100;

pub const CRITICAL_RULES: &[&str] = &[
  "CRITICAL RULES:",
  "1. Customer→Loan: customers.customer_id = account_holders.customer_id, \
   account_holders.account_id = loan_od_working_registers.account_id",
  "2. Product→Disbursement: loan_od_disbursements JOIN account_profiles ON \
   (tenant_code AND account_id), then use product_code",
  "3. Amounts: Use magnitude columns (amount_magnitude, \
   principal_magnitude, total_disbursed_magnitude)",
  "4. Composite Keys: Many tables use (tenant_code, account_id)",
  "5. Active records: Check is_closed=0 or status='ACTIVE'",
];

const PRODUCT_DISBURSEMENT_GUIDANCE: &str = "GUIDANCE: Use \
  loan_od_disbursements JOIN account_profiles ON (tenant_code AND \
  account_id), GROUP BY product_code";
const CUSTOMER_LOAN_GUIDANCE: &str = "GUIDANCE: Use 3-table join: customer → \
  account_holders → loan_od_working_registers";

/// Ordered intent rules over a lower-cased question; the first match wins.
const INTENT_RULES: &[(fn(&str) -> bool, IntentCategory)] = &[
  (
    |q| q.contains("product") && q.contains("disburse"),
    IntentCategory::ProductDisbursement,
  ),
  (
    |q| {
      q.contains("customer")
        && (q.contains("outstanding")
          || q.contains("loan")
          || q.contains("amount"))
    },
    IntentCategory::CustomerLoanAmount,
  ),
  (
    |q| q.contains("branch") && q.contains("collection"),
    IntentCategory::BranchCollection,
  ),
  (
    |q| q.contains("outstanding") || q.contains("portfolio"),
    IntentCategory::OutstandingReport,
  ),
  (
    |q| q.contains("par") || q.contains("npa"),
    IntentCategory::ParNpaReport,
  ),
];

/// The intent bucket a question belongs to, if any.
pub fn classify_intent(question: &str) -> Option<IntentCategory> {
  let q = question.to_lowercase();
  INTENT_RULES
    .iter()
    .find(|(rule, _)| rule(&q))
    .map(|(_, category)| *category)
}

fn truncate(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

fn format_exemplar(exemplar: &QueryExemplar) -> String {
  let mut parts = vec![format!("Similar report: {}", exemplar.report)];

  if !exemplar.tables.is_empty() {
    let tables: Vec<&str> = exemplar
      .tables
      .iter()
      .take(MAX_EXEMPLAR_TABLES)
      .map(String::as_str)
      .collect();
    parts.push(format!("Tables used: {}", tables.join(", ")));
  }

  if let Some(join) = &exemplar.first_join {
    parts.push(format!(
      "Example JOIN: {} ON {}",
      join.table,
      truncate(&join.condition, CONDITION_LEN)
    ));
  }

  if !exemplar.aggregations.is_empty() {
    let functions: Vec<&str> = exemplar
      .aggregations
      .iter()
      .take(MAX_EXEMPLAR_AGGREGATIONS)
      .map(|f| f.as_ref())
      .collect();
    parts.push(format!("Aggregations: {}", functions.join(", ")));
  }

  parts.join(" | ")
}

// ─── KnowledgeContext ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct KnowledgeContext {
  artifact:    Option<KnowledgeArtifact>,
  fingerprint: Option<String>,
}

impl KnowledgeContext {
  pub fn from_artifact(artifact: KnowledgeArtifact) -> Self {
    Self {
      artifact:    Some(artifact),
      fingerprint: None,
    }
  }

  /// A context whose artifact could not be loaded.
  pub fn unavailable() -> Self { Self::default() }

  /// Load the artifact at `path`. A missing or malformed file is logged and
  /// yields an unavailable context.
  pub fn load(path: &Path) -> Self {
    match loanlytics_mining::load_artifact(path) {
      Ok((artifact, fingerprint)) => {
        tracing::info!(
          path = %path.display(),
          tables = artifact.table_count(),
          %fingerprint,
          "knowledge artifact loaded"
        );
        Self {
          artifact:    Some(artifact),
          fingerprint: Some(fingerprint),
        }
      }
      Err(e) => {
        tracing::warn!(
          path = %path.display(),
          "knowledge artifact unavailable, context disabled: {e}"
        );
        Self::unavailable()
      }
    }
  }

  pub fn is_available(&self) -> bool { self.artifact.is_some() }

  pub fn artifact(&self) -> Option<&KnowledgeArtifact> {
    self.artifact.as_ref()
  }

  pub fn fingerprint(&self) -> Option<&str> { self.fingerprint.as_deref() }

  /// Relationship, aggregation and filter hints for one table, joined with
  /// `" | "`. Empty when the table is unknown.
  pub fn context_for_table(&self, table: &str) -> String {
    let Some(artifact) = &self.artifact else {
      return String::new();
    };
    let table = table.to_lowercase();
    let mut parts = Vec::new();

    if let Some(rel) = artifact.table_relationships.get(&table)
      && !rel.joins_with.is_empty()
    {
      let partners: Vec<&str> = rel
        .joins_with
        .iter()
        .take(MAX_JOIN_PARTNERS)
        .map(String::as_str)
        .collect();
      parts.push(format!("Commonly joins with: {}", partners.join(", ")));

      if let Some(example) = rel.common_join_conditions.first() {
        parts.push(format!(
          "Example: JOIN {} ON {}",
          example.with_table,
          truncate(&example.condition, CONDITION_LEN)
        ));
      }
    }

    if let Some(agg) = artifact.aggregation_patterns.get(&table)
      && !agg.sum_columns.is_empty()
    {
      let sums: Vec<&str> = agg
        .sum_columns
        .iter()
        .take(MAX_SUM_COLUMNS)
        .map(String::as_str)
        .collect();
      parts.push(format!("Common SUM: {}", sums.join(", ")));
    }

    if let Some(filters) = artifact.filter_patterns.get(&table)
      && !filters.common_equality_filters.is_empty()
    {
      let eq: Vec<&str> = filters
        .common_equality_filters
        .iter()
        .take(MAX_FILTERS)
        .map(String::as_str)
        .collect();
      parts.push(format!("Common filters: {}", eq.join(", ")));
    }

    parts.join(" | ")
  }

  /// The first exemplar of the question's intent bucket, formatted for the
  /// agent prompt. `None` when no intent rule matches or the matched bucket
  /// is empty; later rules are not consulted.
  pub fn match_intent(&self, question: &str) -> Option<String> {
    let artifact = self.artifact.as_ref()?;
    let category = classify_intent(question)?;
    artifact.exemplars(category).first().map(format_exemplar)
  }

  /// The question followed by the critical rules block, the matched
  /// exemplar and any triggered guidance. Unchanged when the context is
  /// unavailable; empty for an absent question.
  pub fn enrich(&self, question: Option<&str>) -> String {
    let question = match question {
      Some(q) if !q.is_empty() => q,
      other => return other.unwrap_or_default().to_owned(),
    };
    if !self.is_available() {
      return question.to_owned();
    }

    let q = question.to_lowercase();
    let mut sections = vec![CRITICAL_RULES.join("\n")];

    if let Some(pattern) = self.match_intent(question) {
      sections.push(format!("\nSimilar Production Pattern: {pattern}"));
    }
    if q.contains("product") && q.contains("disbursement") {
      sections.push(format!("\n{PRODUCT_DISBURSEMENT_GUIDANCE}"));
    }
    if q.contains("customer") && (q.contains("top") || q.contains("loan")) {
      sections.push(format!("\n{CUSTOMER_LOAN_GUIDANCE}"));
    }

    format!("{question}\n\n{}", sections.join("\n"))
  }
}

#[cfg(test)]
mod tests {
  use loanlytics_core::{
    artifact::{
      AggregationPattern, FilterPattern, JoinSummary, TableRelationship,
    },
    capped::Capped,
    fact::AggregateFunction,
    pattern::JoinExample,
  };

  use super::*;

  fn exemplar(report: &str) -> QueryExemplar {
    QueryExemplar {
      report:       report.into(),
      tables:       (0..7).map(|i| format!("t{i}")).collect(),
      first_join:   Some(JoinSummary {
        table:     "account_profiles".into(),
        condition: "d.account_id = ap.account_id".into(),
      }),
      aggregations: vec![
        AggregateFunction::Sum,
        AggregateFunction::Count,
        AggregateFunction::Max,
        AggregateFunction::Min,
      ],
    }
  }

  fn artifact() -> KnowledgeArtifact {
    let mut artifact = KnowledgeArtifact::default();

    let mut rel = TableRelationship::default();
    for t in ["g", "f", "e", "d", "c", "b", "a"] {
      rel.joins_with.insert(t.into());
    }
    rel.common_join_conditions.push(JoinExample {
      with_table:    "account_holders".into(),
      condition:     format!("c.customer_id = ah.customer_id{}", "x".repeat(200)),
      source_report: "r".into(),
    });
    artifact.table_relationships.insert("customers".into(), rel);

    let mut agg = AggregationPattern::default();
    for c in ["sum(a)", "sum(b)", "sum(c)", "sum(d)"] {
      agg.sum_columns.insert(c.into());
    }
    artifact.aggregation_patterns.insert("customers".into(), agg);

    let mut filters = FilterPattern::default();
    filters.common_equality_filters.insert("c.status".into());
    artifact.filter_patterns.insert("customers".into(), filters);

    let mut bucket = Capped::new();
    bucket.push(exemplar("Product Disbursement Report"));
    bucket.push(exemplar("Second"));
    artifact
      .common_queries
      .insert(IntentCategory::ProductDisbursement, bucket);
    artifact
      .common_queries
      .insert(IntentCategory::CustomerLoanAmount, Capped::new());
    artifact
  }

  #[test]
  fn table_context_sections() {
    let ctx = KnowledgeContext::from_artifact(artifact());
    let text = ctx.context_for_table("CUSTOMERS");
    let parts: Vec<&str> = text.split(" | ").collect();
    assert_eq!(parts[0], "Commonly joins with: a, b, c, d, e");
    assert_eq!(
      parts[1],
      format!(
        "Example: JOIN account_holders ON c.customer_id = ah.customer_id{}",
        "x".repeat(70)
      )
    );
    assert_eq!(parts[2], "Common SUM: sum(a), sum(b), sum(c)");
    assert_eq!(parts[3], "Common filters: c.status");
  }

  #[test]
  fn unknown_table_has_no_context() {
    let ctx = KnowledgeContext::from_artifact(artifact());
    assert_eq!(ctx.context_for_table("nope"), "");
    let unavailable = KnowledgeContext::unavailable();
    assert_eq!(unavailable.context_for_table("customers"), "");
  }

  #[test]
  fn intent_rules_are_ordered() {
    assert_eq!(
      classify_intent("Product wise disbursement for customers"),
      Some(IntentCategory::ProductDisbursement)
    );
    assert_eq!(
      classify_intent("customer outstanding portfolio"),
      Some(IntentCategory::CustomerLoanAmount)
    );
    assert_eq!(
      classify_intent("branch collection outstanding"),
      Some(IntentCategory::BranchCollection)
    );
    assert_eq!(
      classify_intent("portfolio at risk"),
      Some(IntentCategory::OutstandingReport)
    );
    assert_eq!(classify_intent("NPA list"), Some(IntentCategory::ParNpaReport));
    assert_eq!(classify_intent("show top 5 loan accounts"), None);
  }

  #[test]
  fn matched_exemplar_is_formatted() {
    let ctx = KnowledgeContext::from_artifact(artifact());
    let pattern = ctx.match_intent("product disbursement by month").unwrap();
    assert_eq!(
      pattern,
      "Similar report: Product Disbursement Report | \
       Tables used: t0, t1, t2, t3, t4 | \
       Example JOIN: account_profiles ON d.account_id = ap.account_id | \
       Aggregations: SUM, COUNT, MAX"
    );
  }

  #[test]
  fn empty_bucket_does_not_fall_through() {
    let ctx = KnowledgeContext::from_artifact(artifact());
    // Matches customer_loan_amount first, whose bucket is empty.
    assert_eq!(ctx.match_intent("customer loan amount by product"), None);
  }

  #[test]
  fn enrich_layout() {
    let ctx = KnowledgeContext::from_artifact(artifact());
    let out = ctx.enrich(Some("product disbursement totals"));
    let (question, rest) = out.split_once("\n\n").unwrap();
    assert_eq!(question, "product disbursement totals");
    assert!(rest.starts_with("CRITICAL RULES:\n1. Customer→Loan"));
    assert!(rest.contains("\n\nSimilar Production Pattern: Similar report: "));
    assert!(rest.ends_with(&format!("\n\n{PRODUCT_DISBURSEMENT_GUIDANCE}")));
    assert!(!rest.contains(CUSTOMER_LOAN_GUIDANCE));
  }

  #[test]
  fn enrich_top_loan_accounts() {
    let ctx = KnowledgeContext::from_artifact(artifact());
    let out = ctx.enrich(Some("show top 5 loan accounts"));
    assert!(out.starts_with("show top 5 loan accounts\n\nCRITICAL RULES:"));
    assert!(!out.contains("Similar Production Pattern"));
    assert!(!out.contains("GUIDANCE"));
  }

  #[test]
  fn enrich_degrades_gracefully() {
    let ctx = KnowledgeContext::unavailable();
    assert_eq!(ctx.enrich(Some("customer loans")), "customer loans");
    assert_eq!(ctx.enrich(None), "");
    let available = KnowledgeContext::from_artifact(artifact());
    assert_eq!(available.enrich(Some("")), "");
    assert_eq!(available.enrich(None), "");
  }

  #[test]
  fn load_missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = KnowledgeContext::load(&dir.path().join("missing.json"));
    assert!(!ctx.is_available());

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, b"{not json").unwrap();
    assert!(!KnowledgeContext::load(&bad).is_available());
  }

  #[test]
  fn load_records_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("k.json");
    std::fs::write(&path, artifact().to_json_pretty().unwrap()).unwrap();
    let ctx = KnowledgeContext::load(&path);
    assert!(ctx.is_available());
    assert_eq!(ctx.fingerprint().map(str::len), Some(64));
  }
}
