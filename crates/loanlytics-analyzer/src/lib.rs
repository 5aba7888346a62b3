//! Regex-based SQL structural analyzer.
//!
//! Turns one report's raw SQL text into a
//! [`ReportQueryFact`](loanlytics_core::fact::ReportQueryFact). This is a
//! token-level scanner, not a parser: each field is extracted independently
//! and a field whose pattern finds nothing is simply left empty. Pure
//! synchronous; no IO.
//!
//! # Quick start
//!
//! ```no_run
//! use loanlytics_analyzer::RegexAnalyzer;
//!
//! let analyzer = RegexAnalyzer::new().unwrap();
//! let fact = analyzer
//!   .analyze("Loan Book", "SELECT id FROM financialForms.loan_accounts")
//!   .unwrap();
//! println!("{} tables, tags {:?}", fact.tables.len(), fact.business_tags);
//! ```

mod clause;
pub mod error;
mod extract;
mod tags;

pub use error::{Error, Result};
use loanlytics_core::{analyzer::QueryAnalyzer, fact::ReportQueryFact};

use crate::extract::Patterns;

/// The bundled [`QueryAnalyzer`]. Construct once and reuse; all patterns are
/// compiled up front.
pub struct RegexAnalyzer {
  patterns: Patterns,
}

impl RegexAnalyzer {
  pub fn new() -> Result<Self> {
    Ok(Self {
      patterns: Patterns::compile()?,
    })
  }

  /// Analyze one report. Fails only on blank query text.
  pub fn analyze(&self, report_name: &str, sql: &str) -> Result<ReportQueryFact> {
    if sql.trim().is_empty() {
      return Err(Error::EmptyQuery);
    }

    let sql = clause::strip_comments(sql);
    let sql = sql.as_ref();
    let p = &self.patterns;
    let mut fact = ReportQueryFact {
      report_name:   report_name.to_owned(),
      tables:        p.tables(sql),
      joins:         p.joins(sql),
      columns:       p.columns(sql),
      aggregations:  p.aggregations(sql),
      filters:       p.filters(sql),
      group_by:      p.group_by(sql),
      order_by:      p.order_by(sql),
      business_tags: Vec::new(),
    };
    fact.business_tags = tags::infer(&fact);
    Ok(fact)
  }
}

impl QueryAnalyzer for RegexAnalyzer {
  type Error = Error;

  fn analyze(&self, report_name: &str, sql: &str) -> Result<ReportQueryFact> {
    RegexAnalyzer::analyze(self, report_name, sql)
  }
}

#[cfg(test)]
mod tests {
  use loanlytics_core::fact::{AggregateFunction, JoinKind, TableRef};

  use super::*;

  const BRANCH_COLLECTION_SQL: &str = "SELECT b.branch_name, \
     SUM(r.principal_magnitude) AS total FROM repayments r JOIN branch_master \
     b ON r.branch_id=b.id GROUP BY b.branch_name";

  fn analyzer() -> RegexAnalyzer { RegexAnalyzer::new().unwrap() }

  #[test]
  fn branch_collection_summary() {
    let fact = analyzer()
      .analyze("Branch Collection Summary", BRANCH_COLLECTION_SQL)
      .unwrap();

    let tables: Vec<_> = fact.tables.iter().cloned().collect();
    assert_eq!(tables, vec![
      TableRef::new("branch_master", Some("b")),
      TableRef::new("repayments", Some("r")),
    ]);

    assert_eq!(fact.joins.len(), 1);
    assert_eq!(fact.joins[0].table, "branch_master");
    assert_eq!(fact.joins[0].kind, JoinKind::Inner);
    assert!(fact.joins[0].condition.contains("r.branch_id=b.id"));

    assert_eq!(fact.aggregations.len(), 1);
    assert_eq!(fact.aggregations[0].function, AggregateFunction::Sum);
    assert_eq!(fact.aggregations[0].alias.as_deref(), Some("total"));

    assert_eq!(fact.group_by, vec!["b.branch_name"]);
    assert!(
      fact
        .business_tags
        .iter()
        .any(|t| t.contains("Collections/Repayment Report"))
    );
    assert!(
      fact
        .business_tags
        .iter()
        .any(|t| t.contains("Branch-wise analysis"))
    );
  }

  fn assert_branch_shape(fact: &ReportQueryFact) {
    let names: Vec<_> = fact.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["branch_name", "total"]);
    assert_eq!(fact.filters.len(), 1);
    assert_eq!(fact.filters[0].column, "r.status");
    assert_eq!(fact.group_by, vec!["b.branch_name"]);
    assert!(
      fact
        .business_tags
        .iter()
        .any(|t| t.contains("Branch-wise analysis"))
    );
  }

  #[test]
  fn comment_with_apostrophe_keeps_clauses() {
    let sql = "SELECT b.branch_name, -- branch's display name\n\
               SUM(r.principal_magnitude) AS total /* it's summed */\n\
               FROM repayments r JOIN branch_master b ON r.branch_id = b.id\n\
               WHERE r.status = 'PAID'\n\
               GROUP BY b.branch_name";
    let fact = analyzer().analyze("Branch Collection", sql).unwrap();
    assert_branch_shape(&fact);
    assert_eq!(fact.columns[0].expression, "b.branch_name");
  }

  #[test]
  fn backslash_escaped_quote_keeps_clauses() {
    let sql = r"SELECT b.branch_name, SUM(r.principal_magnitude) AS total
               FROM repayments r JOIN branch_master b ON r.branch_id = b.id
               WHERE r.status = 'PAID' AND r.note LIKE 'it's%'
               GROUP BY b.branch_name";
    let fact = analyzer().analyze("Branch Collection", sql).unwrap();
    let names: Vec<_> = fact.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["branch_name", "total"]);
    assert_eq!(fact.group_by, vec!["b.branch_name"]);
    assert_eq!(fact.filters.len(), 2);
    assert!(
      fact
        .business_tags
        .iter()
        .any(|t| t.contains("Branch-wise analysis"))
    );
  }

  #[test]
  fn commented_out_join_is_ignored() {
    let sql = "SELECT b.branch_name, SUM(r.principal_magnitude) AS total \
               FROM repayments r JOIN branch_master b ON r.branch_id = b.id \
               /* JOIN customers c ON c.id = r.customer_id */ \
               WHERE r.status = 'PAID' GROUP BY b.branch_name";
    let fact = analyzer().analyze("Branch Collection", sql).unwrap();
    assert_branch_shape(&fact);
    assert_eq!(fact.joins.len(), 1);
    assert!(fact.tables.iter().all(|t| t.name != "customers"));
  }

  #[test]
  fn analysis_is_deterministic() {
    let sql = "select c.id, count(*) from customer c \
               left join loan_accounts la on la.customer_id = c.id \
               where la.is_closed = 0 and c.created_date > '2020-01-01' \
               group by c.id order by 2 desc limit 5";
    let a = analyzer();
    let first = a.analyze("Customer Loans", sql).unwrap();
    let second = a.analyze("Customer Loans", sql).unwrap();
    assert_eq!(first, second);
    assert_eq!(
      serde_json::to_string(&first).unwrap(),
      serde_json::to_string(&second).unwrap()
    );
  }

  #[test]
  fn blank_query_is_rejected() {
    assert!(matches!(
      analyzer().analyze("r", "  \n\t"),
      Err(Error::EmptyQuery)
    ));
  }

  #[test]
  fn malformed_sql_yields_partial_fact() {
    let fact = analyzer()
      .analyze("Loan dump", "SELECT FROM WHERE (((")
      .unwrap();
    assert!(fact.joins.is_empty());
    assert!(fact.aggregations.is_empty());
    assert_eq!(fact.business_tags, vec!["Type: Loan Report"]);
  }

  #[test]
  fn usable_through_trait() {
    fn run<A: QueryAnalyzer>(a: &A) -> ReportQueryFact {
      a.analyze("t", "SELECT 1 FROM dual").unwrap()
    }
    let fact = run(&analyzer());
    assert_eq!(fact.table_names(), vec!["dual"]);
  }
}
