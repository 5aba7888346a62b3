//! Schema-qualifier repair.
//!
//! Generated SQL often names tables without the schema they live in. For
//! every bare `FROM`/`JOIN`/`UPDATE` reference to a table in the lookup map,
//! [`SchemaRepair`] inserts `<schema>.` in front of the table name. If any
//! known schema prefix already appears anywhere in the query, the query is
//! left untouched.

use std::{borrow::Cow, collections::BTreeMap};

use regex::{Captures, Regex};

use crate::error::{Result, compile};

/// The built-in table → schema lookup.
pub fn default_schema_map() -> BTreeMap<String, String> {
  [
    ("loan_od_working_registers", "encoredb"),
    ("loan_od_disbursements", "encoredb"),
    ("account_profiles", "encoredb"),
    ("account_holders", "encoredb"),
    ("customers", "encoredb"),
    ("loan_accounts", "financialForms"),
    ("customer", "financialForms"),
    ("branch_master", "financialForms"),
    ("loan_repayment_details", "financialForms"),
  ]
  .into_iter()
  .map(|(table, schema)| (table.to_owned(), schema.to_owned()))
  .collect()
}

struct Patterns {
  /// Any `<schema>.` for a schema in the map.
  qualified: Regex,
  /// `<keyword><ws><table>` for a table in the map.
  reference: Regex,
}

pub struct SchemaRepair {
  map:      BTreeMap<String, String>,
  patterns: Option<Patterns>,
}

impl SchemaRepair {
  /// Build a repairer for `map` (table → schema). Table names are matched
  /// case-insensitively.
  pub fn new(map: BTreeMap<String, String>) -> Result<Self> {
    let map: BTreeMap<String, String> = map
      .into_iter()
      .map(|(table, schema)| (table.to_lowercase(), schema))
      .collect();
    if map.is_empty() {
      return Ok(Self {
        map,
        patterns: None,
      });
    }

    let mut schemas: Vec<String> =
      map.values().map(|s| regex::escape(s)).collect();
    schemas.sort();
    schemas.dedup();

    // Longest first so `customers` is preferred over `customer`.
    let mut tables: Vec<&String> = map.keys().collect();
    tables.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let tables: Vec<String> = tables.into_iter().map(|t| regex::escape(t)).collect();

    let patterns = Patterns {
      qualified: compile(&format!(r"(?i)\b(?:{})\.", schemas.join("|")))?,
      reference: compile(&format!(
        r"(?i)\b(FROM|JOIN|UPDATE)(\s+)({})\b",
        tables.join("|")
      ))?,
    };
    Ok(Self {
      map,
      patterns: Some(patterns),
    })
  }

  /// Insert missing schema prefixes. Returns the input unchanged (borrowed)
  /// when there is nothing to do. Idempotent.
  pub fn repair<'a>(&self, sql: &'a str) -> Cow<'a, str> {
    let Some(patterns) = &self.patterns else {
      return Cow::Borrowed(sql);
    };
    if patterns.qualified.is_match(sql) {
      return Cow::Borrowed(sql);
    }
    if !patterns.reference.is_match(sql) {
      return Cow::Borrowed(sql);
    }

    let repaired = patterns.reference.replace_all(sql, |caps: &Captures| {
      let whole = &caps[0];
      let end = caps.get(0).map_or(0, |m| m.end());
      // `table.column` is a column reference, not a table.
      if sql[end..].starts_with('.') {
        return whole.to_owned();
      }
      let table = &caps[3];
      match self.map.get(&table.to_lowercase()) {
        Some(schema) => format!("{}{}{schema}.{table}", &caps[1], &caps[2]),
        None => whole.to_owned(),
      }
    });

    if repaired == sql {
      Cow::Borrowed(sql)
    } else {
      tracing::debug!(before = %sql, after = %repaired, "added schema prefixes");
      Cow::Owned(repaired.into_owned())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn repairer() -> SchemaRepair { SchemaRepair::new(default_schema_map()).unwrap() }

  #[test]
  fn qualifies_bare_table() {
    let map = BTreeMap::from([("loan_accounts".to_owned(), "financialForms".to_owned())]);
    let repair = SchemaRepair::new(map).unwrap();
    assert_eq!(
      repair.repair("SELECT * FROM loan_accounts WHERE id=1"),
      "SELECT * FROM financialForms.loan_accounts WHERE id=1"
    );
  }

  #[test]
  fn existing_prefix_suppresses_everything() {
    let sql = "SELECT * FROM financialForms.x JOIN loan_accounts la ON 1=1";
    let out = repairer().repair(sql);
    assert_eq!(out, sql);
    assert!(matches!(out, Cow::Borrowed(_)));
  }

  #[test]
  fn preserves_keyword_whitespace_and_table_casing() {
    let out = repairer().repair(
      "select c.id from Customers c\n  inner join\taccount_holders ah on 1=1",
    );
    assert_eq!(
      out,
      "select c.id from encoredb.Customers c\n  inner join\tencoredb.account_holders ah on 1=1"
    );
  }

  #[test]
  fn prefers_longest_table_name() {
    assert_eq!(
      repairer().repair("SELECT * FROM customer JOIN customers"),
      "SELECT * FROM financialForms.customer JOIN encoredb.customers"
    );
  }

  #[test]
  fn ignores_unknown_and_partial_names() {
    let sql = "SELECT * FROM customer_notes JOIN loan_accounts_archive";
    assert!(matches!(repairer().repair(sql), Cow::Borrowed(_)));
  }

  #[test]
  fn repair_is_idempotent() {
    let samples = [
      "SELECT * FROM loan_accounts",
      "SELECT * FROM customers c JOIN account_holders ah ON c.id = ah.id",
      "UPDATE branch_master SET x = 1",
      "SELECT 1",
      "SELECT * FROM encoredb.customers JOIN customer",
    ];
    let repair = repairer();
    for sql in samples {
      let once = repair.repair(sql).into_owned();
      let twice = repair.repair(&once).into_owned();
      assert_eq!(once, twice, "{sql}");
    }
  }

  #[test]
  fn empty_map_is_a_no_op() {
    let repair = SchemaRepair::new(BTreeMap::new()).unwrap();
    assert!(matches!(repair.repair("SELECT * FROM customers"), Cow::Borrowed(_)));
    assert!(matches!(
      repair.repair("SELECT * FROM encoredb.customers"),
      Cow::Borrowed(_)
    ));
  }
}
