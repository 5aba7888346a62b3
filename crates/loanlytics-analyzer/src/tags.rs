//! Business-tag inference.
//!
//! Tags are plain keyword lookups over the report name and the structural
//! fields already extracted. Matching is on lower-cased substrings, so
//! `"par"` also matches names such as `"Partner Summary"`.

use loanlytics_core::fact::{AggregateFunction, ReportQueryFact};

/// Report-type rules; the first matching rule wins.
const REPORT_TYPES: &[(&[&str], &str)] = &[
  (&["collection"], "Type: Collections/Repayment Report"),
  (&["disbursement"], "Type: Disbursement Report"),
  (&["portfolio", "outstanding"], "Type: Portfolio/Outstanding Report"),
  (&["par", "npa"], "Type: Asset Quality Report"),
  (&["customer"], "Type: Customer Report"),
  (&["loan"], "Type: Loan Report"),
];

pub(crate) const SUM_TAG: &str = "Calculation: Aggregating amounts (SUM)";
pub(crate) const COUNT_TAG: &str = "Calculation: Counting records";
pub(crate) const DATE_FILTER_TAG: &str = "Filter: Date-based filtering";
pub(crate) const BRANCH_GROUPING_TAG: &str = "Grouping: Branch-wise analysis";
pub(crate) const PRODUCT_GROUPING_TAG: &str = "Grouping: Product-wise analysis";
pub(crate) const CUSTOMER_SCOPE_TAG: &str = "Scope: Customer-level data";
pub(crate) const ACCOUNT_SCOPE_TAG: &str = "Scope: Account/Loan-level data";

/// Infer tags for `fact`, whose structural fields must already be filled.
pub(crate) fn infer(fact: &ReportQueryFact) -> Vec<String> {
  let name = fact.report_name.to_lowercase();
  let mut tags: Vec<&str> = Vec::new();

  if let Some((_, tag)) = REPORT_TYPES
    .iter()
    .find(|(words, _)| words.iter().any(|w| name.contains(w)))
  {
    tags.push(*tag);
  }

  let uses =
    |f: AggregateFunction| fact.aggregations.iter().any(|a| a.function == f);
  if uses(AggregateFunction::Sum) {
    tags.push(SUM_TAG);
  }
  if uses(AggregateFunction::Count) {
    tags.push(COUNT_TAG);
  }

  if fact.filters.iter().any(|f| f.column.contains("date")) {
    tags.push(DATE_FILTER_TAG);
  }

  let grouped_by = |word: &str| {
    fact
      .group_by
      .iter()
      .any(|g| g.to_lowercase().contains(word))
  };
  if grouped_by("branch") {
    tags.push(BRANCH_GROUPING_TAG);
  }
  if grouped_by("product") {
    tags.push(PRODUCT_GROUPING_TAG);
  }

  if fact.tables.iter().any(|t| t.name.contains("customer")) {
    tags.push(CUSTOMER_SCOPE_TAG);
  }
  if fact
    .tables
    .iter()
    .any(|t| t.name.contains("account") || t.name.contains("loan"))
  {
    tags.push(ACCOUNT_SCOPE_TAG);
  }

  tags.into_iter().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
  use loanlytics_core::fact::{
    Aggregation, FilterPredicate, PredicateKind, TableRef,
  };

  use super::*;

  #[test]
  fn first_report_type_wins() {
    let fact = ReportQueryFact::empty("Customer Disbursement Collection");
    assert_eq!(infer(&fact), vec!["Type: Collections/Repayment Report"]);

    let fact = ReportQueryFact::empty("Outstanding Loan Book");
    assert_eq!(infer(&fact), vec!["Type: Portfolio/Outstanding Report"]);
  }

  #[test]
  fn par_matches_as_substring() {
    let fact = ReportQueryFact::empty("Partner Listing");
    assert_eq!(infer(&fact), vec!["Type: Asset Quality Report"]);
  }

  #[test]
  fn structural_tags_follow_type_in_fixed_order() {
    let mut fact = ReportQueryFact::empty("misc");
    fact.aggregations.push(Aggregation {
      function:   AggregateFunction::Count,
      expression: "COUNT(*)".into(),
      alias:      None,
    });
    fact.filters.push(FilterPredicate {
      column: "l.disbursement_date".into(),
      kind:   PredicateKind::GreaterThan,
    });
    fact.group_by.push("ap.Product_Code".into());
    fact.tables.insert(TableRef::new("encoredb.customers", Some("c")));
    fact.tables.insert(TableRef::new("encoredb.account_holders", None));

    assert_eq!(infer(&fact), vec![
      COUNT_TAG,
      DATE_FILTER_TAG,
      PRODUCT_GROUPING_TAG,
      CUSTOMER_SCOPE_TAG,
      ACCOUNT_SCOPE_TAG,
    ]);
  }

  #[test]
  fn no_signals_no_tags() {
    assert!(infer(&ReportQueryFact::empty("Misc")).is_empty());
  }
}
