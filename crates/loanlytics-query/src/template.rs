//! Fixed SQL templates for the most common questions.
//!
//! Checked before any generation step; the first matching template wins.

use regex::Regex;
use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::error::{Result, compile};

pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemplateKind {
  ProductDisbursement,
  TopCustomersByLoanAmount,
  ProductLoanCount,
  LoanAccounts,
  PortfolioTotal,
  BranchCollection,
  RepaymentTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
  pub name: TemplateKind,
  pub sql:  String,
}

const PRODUCT_DISBURSEMENT: &str = "\
SELECT
    ap.product_code,
    SUM(lod.amount_magnitude) AS total_disbursement_amount
FROM encoredb.loan_od_disbursements lod
INNER JOIN encoredb.account_profiles ap
    ON lod.tenant_code = ap.tenant_code AND lod.account_id = ap.account_id
GROUP BY ap.product_code
ORDER BY total_disbursement_amount DESC
LIMIT 100";

const PRODUCT_LOAN_COUNT: &str = "\
SELECT
    ap.product_code,
    COUNT(DISTINCT lw.account_id) AS loan_count
FROM encoredb.loan_od_working_registers lw
INNER JOIN encoredb.account_profiles ap
    ON lw.tenant_code = ap.tenant_code AND lw.account_id = ap.account_id
GROUP BY ap.product_code
ORDER BY loan_count DESC
LIMIT 100";

const PORTFOLIO_TOTAL: &str = "\
SELECT
    SUM(total_disbursed_magnitude) AS total_outstanding,
    COUNT(DISTINCT account_id) AS total_accounts
FROM encoredb.loan_od_working_registers
WHERE is_closed = 0";

const BRANCH_COLLECTION: &str = "\
SELECT
    b.branch_name,
    b.branch_code,
    SUM(lor.principal_magnitude) AS total_collection
FROM encoredb.loan_od_repayments lor
INNER JOIN encoredb.loan_od_working_registers lowr
    ON lor.tenant_code = lowr.tenant_code AND lor.account_id = lowr.account_id
INNER JOIN encoredb.account_holders ah ON lowr.account_id = ah.account_id
INNER JOIN financialForms.loan_accounts la ON ah.customer_id = la.customer_id
INNER JOIN financialForms.branch_master b ON la.branch_id = b.id
GROUP BY b.branch_name, b.branch_code
ORDER BY total_collection DESC
LIMIT 100";

const REPAYMENT_TOTALS: &str = "\
SELECT
    lor.tenant_code,
    lor.account_id,
    SUM(lor.principal_magnitude) AS total_repayment,
    SUM(lor.interest_magnitude) AS total_interest
FROM encoredb.loan_od_repayments lor
GROUP BY lor.tenant_code, lor.account_id
ORDER BY total_repayment DESC
LIMIT 100";

fn top_customers(limit: u64) -> String {
  format!(
    "\
SELECT
    c.id,
    c.customer_id,
    c.first_name,
    c.last_name,
    SUM(lw.total_disbursed_magnitude) as total_loan_amount
FROM encoredb.customers c
INNER JOIN encoredb.account_holders ah ON c.customer_id = ah.customer_id
INNER JOIN encoredb.loan_od_working_registers lw ON ah.account_id = lw.account_id
GROUP BY c.id, c.customer_id, c.first_name, c.last_name
ORDER BY total_loan_amount DESC
LIMIT {limit}"
  )
}

fn loan_accounts(limit: u64) -> String {
  format!(
    "\
SELECT
    la.id,
    la.account_number,
    la.customer_id,
    la.loan_amount,
    la.loan_disbursement_date,
    la.is_closed
FROM financialForms.loan_accounts la
WHERE la.loan_disbursement_date IS NOT NULL
ORDER BY la.id DESC
LIMIT {limit}"
  )
}

pub struct TemplateMatcher {
  top:   Regex,
  first: Regex,
}

impl TemplateMatcher {
  pub fn new() -> Result<Self> {
    Ok(Self {
      top:   compile(r"top\s+(\d+)")?,
      first: compile(r"first\s+(\d+)")?,
    })
  }

  fn limit(pattern: &Regex, q: &str) -> u64 {
    pattern
      .captures(q)
      .and_then(|c| c[1].parse().ok())
      .unwrap_or(DEFAULT_LIMIT)
  }

  /// The first template whose keyword rule matches `question`.
  pub fn find(&self, question: &str) -> Option<Template> {
    let q = question.to_lowercase();
    let has = |w: &str| q.contains(w);

    let (name, sql) = if has("product") && has("disburs") {
      (TemplateKind::ProductDisbursement, PRODUCT_DISBURSEMENT.to_owned())
    } else if (has("top") || has("customer")) && has("loan") && has("amount") {
      let limit = if has("top") {
        Self::limit(&self.top, &q)
      } else {
        DEFAULT_LIMIT
      };
      (TemplateKind::TopCustomersByLoanAmount, top_customers(limit))
    } else if has("product") && (has("count") || has("number")) && has("loan")
    {
      (TemplateKind::ProductLoanCount, PRODUCT_LOAN_COUNT.to_owned())
    } else if has("loan")
      && has("account")
      && (has("first") || has("show") || has("list") || has("top"))
    {
      let limit = if has("first") {
        Self::limit(&self.first, &q)
      } else if has("top") {
        Self::limit(&self.top, &q)
      } else {
        DEFAULT_LIMIT
      };
      (TemplateKind::LoanAccounts, loan_accounts(limit))
    } else if (has("outstanding") || has("portfolio"))
      && (has("total") || has("sum"))
    {
      (TemplateKind::PortfolioTotal, PORTFOLIO_TOTAL.to_owned())
    } else if has("branch") && (has("collection") || has("repayment")) {
      (TemplateKind::BranchCollection, BRANCH_COLLECTION.to_owned())
    } else if (has("repayment") || has("collection")) && !has("disbursement") {
      (TemplateKind::RepaymentTotals, REPAYMENT_TOTALS.to_owned())
    } else {
      return None;
    };

    Some(Template { name, sql })
  }
}
