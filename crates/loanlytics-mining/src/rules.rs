//! Hand-curated business rules.
//!
//! These are authored, not mined. Bump [`RULES_VERSION`] whenever the block
//! changes so artifacts built from different revisions can be told apart.

use std::collections::BTreeMap;

use loanlytics_core::artifact::BusinessRule;

pub const RULES_VERSION: u32 = 1;

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| (*s).to_owned()).collect()
}

/// The curated rule set, keyed by rule name.
pub fn curated_rules() -> BTreeMap<String, BusinessRule> {
  let rules = [
    ("customer_identification", BusinessRule {
      description: "Customers identified by URN or ID".into(),
      tables: strings(&["perdix_db.customer", "financialforms.customer"]),
      key_columns: strings(&["urn_no", "id", "customer_id"]),
      usage_note: "255 reports use customer tables".into(),
      ..Default::default()
    }),
    ("loan_account_linking", BusinessRule {
      description: "Loans linked via account_number or account_id".into(),
      tables: strings(&[
        "perdix_db.loan_accounts",
        "financialforms.loan_accounts",
        "encoredb.loan_od_working_registers",
      ]),
      key_columns: strings(&["account_number", "account_id"]),
      usage_note: "177 reports use loan tables".into(),
      ..Default::default()
    }),
    ("product_classification", BusinessRule {
      description: "Products identified by product_code".into(),
      tables: strings(&[
        "perdix_db.loan_products",
        "financialforms.loan_products",
      ]),
      key_columns: strings(&["product_code"]),
      usage_note: "58 reports use product tables".into(),
      ..Default::default()
    }),
    ("branch_hierarchy", BusinessRule {
      description: "Branches organized hierarchically with hub relationships"
        .into(),
      tables: strings(&[
        "perdix_db.branch_master",
        "financialforms.branch_master",
        "perdix_db.hub_master",
      ]),
      key_columns: strings(&["branch_id", "hub_id", "branch_code"]),
      usage_note: "215 reports use branch tables".into(),
      ..Default::default()
    }),
    ("amount_calculations", BusinessRule {
      description: "Amounts stored in magnitude fields (often in paisa, \
                    divide by 100)"
        .into(),
      common_patterns: strings(&[
        "SUM(amount_magnitude)",
        "SUM(principal_magnitude)",
        "SUM(total_disbursed_magnitude)",
        "SUM(principal_outstanding)",
      ]),
      usage_note: "1315 SUM operations across all reports".into(),
      ..Default::default()
    }),
    ("disbursement_tracking", BusinessRule {
      description: "Disbursements tracked in loan_od_disbursements and \
                    related tables"
        .into(),
      tables: strings(&[
        "encoredb.loan_od_disbursements",
        "financialforms.loan_account_disbursement_schedule",
      ]),
      key_relationships: strings(&[
        "loan_od_disbursements JOIN account_profiles ON (tenant_code AND \
         account_id)",
        "account_profiles has product_code",
      ]),
      usage_note: "21 disbursement reports".into(),
      ..Default::default()
    }),
    ("collection_tracking", BusinessRule {
      description: "Collections tracked in loan_repayment_details and \
                    loan_od_repayments"
        .into(),
      tables: strings(&[
        "perdix_db.loan_repayment_details",
        "encoredb.loan_od_repayments",
        "financialforms.loan_collections",
      ]),
      key_relationships: strings(&[
        "JOIN via transaction_id",
        "JOIN via account_number",
      ]),
      usage_note: "32 collection reports".into(),
      ..Default::default()
    }),
    ("customer_loan_relationship", BusinessRule {
      description: "Customer to Loan via account_holders (3-table join)"
        .into(),
      key_relationships: strings(&[
        "customer.customer_id = account_holders.customer_id",
        "account_holders.account_id = loan_od_working_registers.account_id",
        "Alternative: loan_accounts.customer_id = customer.id",
      ]),
      usage_note: "Critical relationship used in 162 customer reports".into(),
      ..Default::default()
    }),
  ];

  rules
    .into_iter()
    .map(|(name, rule)| (name.to_owned(), rule))
    .collect()
}
