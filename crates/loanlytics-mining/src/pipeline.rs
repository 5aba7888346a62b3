//! The offline mining job: reports in, knowledge artifact and summary out.

use loanlytics_core::{
  analyzer::QueryAnalyzer,
  artifact::KnowledgeArtifact,
  fact::ReportQueryFact,
  pattern::TablePatterns,
  report::ReportRecord,
};

use crate::{
  aggregate::Aggregator,
  builder::KnowledgeBuilder,
  error::Result,
  fingerprint::fingerprint,
  rules::RULES_VERSION,
  summary::{MiningSummary, SkippedReport},
};

/// Progress is logged every this many reports.
const PROGRESS_EVERY: usize = 20;

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct MiningRun {
  pub facts:    Vec<ReportQueryFact>,
  pub patterns: TablePatterns,
  pub artifact: KnowledgeArtifact,
  pub summary:  MiningSummary,
}

pub struct MiningPipeline<A> {
  analyzer: A,
  builder:  KnowledgeBuilder,
}

impl<A: QueryAnalyzer> MiningPipeline<A> {
  pub fn new(analyzer: A) -> Self {
    Self {
      analyzer,
      builder: KnowledgeBuilder::new(),
    }
  }

  /// Analyze every report in order, skipping those that fail, then aggregate
  /// and build the artifact.
  pub fn run(&self, reports: &[ReportRecord]) -> Result<MiningRun> {
    tracing::info!(reports = reports.len(), "mining started");

    let mut facts = Vec::with_capacity(reports.len());
    let mut skipped = Vec::new();
    let mut aggregator = Aggregator::new();

    for (i, report) in reports.iter().enumerate() {
      if (i + 1) % PROGRESS_EVERY == 0 {
        tracing::info!("progress: {}/{} reports analyzed", i + 1, reports.len());
      }

      let sql = report.query().unwrap_or_default();
      match self.analyzer.analyze(&report.name, sql) {
        Ok(fact) => {
          aggregator.add(&fact);
          facts.push(fact);
        }
        Err(e) => {
          tracing::warn!(
            id = report.id,
            report = %report.name,
            "skipping report: {e}"
          );
          skipped.push(SkippedReport {
            id:     report.id,
            name:   report.name.clone(),
            reason: e.to_string(),
          });
        }
      }
    }

    let patterns = aggregator.finish();
    let artifact = self.builder.build(&patterns, &facts);

    let mut summary =
      MiningSummary::compute(reports.len(), &facts, skipped, RULES_VERSION);
    summary.fingerprint = Some(fingerprint(&artifact.to_json_pretty()?));

    tracing::info!(
      analyzed = summary.analyzed_reports,
      skipped = summary.skipped.len(),
      tables = patterns.len(),
      "mining finished"
    );

    Ok(MiningRun {
      facts,
      patterns,
      artifact,
      summary,
    })
  }
}

#[cfg(test)]
mod tests {
  use loanlytics_analyzer::RegexAnalyzer;
  use loanlytics_core::artifact::IntentCategory;

  use super::*;

  fn pipeline() -> MiningPipeline<RegexAnalyzer> {
    MiningPipeline::new(RegexAnalyzer::new().unwrap())
  }

  fn reports() -> Vec<ReportRecord> {
    vec![
      ReportRecord::new(
        1,
        "Customer Loan Outstanding",
        "SELECT c.id, SUM(lw.total_disbursed_magnitude) AS amt \
         FROM customers c \
         JOIN account_holders ah ON c.customer_id = ah.customer_id \
         JOIN loan_od_working_registers lw ON ah.account_id = lw.account_id \
         WHERE lw.is_closed = 0 GROUP BY c.id",
      ),
      ReportRecord {
        id:         2,
        name:       "Broken".into(),
        query_text: Some("   ".into()),
      },
      ReportRecord::new(
        3,
        "Product Disbursement",
        "SELECT ap.product_code, SUM(d.amount_magnitude) \
         FROM loan_od_disbursements d \
         INNER JOIN account_profiles ap ON d.tenant_code = ap.tenant_code \
         AND d.account_id = ap.account_id GROUP BY ap.product_code",
      ),
    ]
  }

  #[test]
  fn failed_reports_are_skipped_not_fatal() {
    let run = pipeline().run(&reports()).unwrap();
    assert_eq!(run.facts.len(), 2);
    assert_eq!(run.summary.total_reports, 3);
    assert_eq!(run.summary.skipped.len(), 1);
    assert_eq!(run.summary.skipped[0].id, 2);
  }

  #[test]
  fn artifact_reflects_mined_patterns() {
    let run = pipeline().run(&reports()).unwrap();
    let customers = &run.artifact.table_relationships["customers"];
    assert!(customers.joins_with.contains("account_holders"));
    assert!(customers.joins_with.contains("loan_od_working_registers"));
    assert_eq!(customers.usage_count, 1);

    let filters = &run.artifact.filter_patterns["loan_od_working_registers"];
    assert_eq!(filters.common_equality_filters.as_slice(), &["lw.is_closed"]);

    let products = run.artifact.exemplars(IntentCategory::ProductDisbursement);
    assert_eq!(products[0].report, "Product Disbursement");
    let customer = run.artifact.exemplars(IntentCategory::CustomerLoanAmount);
    assert_eq!(customer[0].report, "Customer Loan Outstanding");
  }

  #[test]
  fn rebuilding_is_deterministic() {
    let a = pipeline().run(&reports()).unwrap();
    let b = pipeline().run(&reports()).unwrap();
    assert_eq!(a.artifact, b.artifact);
    assert_eq!(a.summary.fingerprint, b.summary.fingerprint);
    assert_ne!(a.summary.run_id, b.summary.run_id);
  }
}
