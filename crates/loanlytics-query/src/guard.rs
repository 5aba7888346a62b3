//! Read-only SQL guard.
//!
//! Generated SQL must be a single `SELECT` before anything runs it.

use std::collections::BTreeSet;

use regex::Regex;
use thiserror::Error;

use crate::error::{Result, compile};

/// Statements that change data or schema, checked in this order.
pub const BLOCKED_KEYWORDS: &[&str] = &[
  "INSERT", "UPDATE", "DELETE", "DROP", "TRUNCATE", "ALTER", "CREATE", "GRANT",
  "REVOKE", "EXEC", "EXECUTE", "CALL", "MERGE", "REPLACE", "LOAD", "COPY",
  "LOCK", "UNLOCK",
];

/// Why a query was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("Empty query")]
  Empty,
  #[error(
    "Operation '{0}' is not allowed. Only SELECT queries are permitted."
  )]
  Blocked(&'static str),
  #[error("Only SELECT queries are allowed.")]
  NotSelect,
  #[error("Multiple statements are not allowed.")]
  MultipleStatements,
  #[error("UNION must combine SELECT queries only.")]
  UnsafeUnion,
}

pub struct ReadOnlyGuard {
  blocked: Regex,
  union:   Regex,
}

impl ReadOnlyGuard {
  pub fn new() -> Result<Self> {
    Ok(Self {
      blocked: compile(&format!(r"(?i)\b(?:{})\b", BLOCKED_KEYWORDS.join("|")))?,
      union:   compile(r"(?i)\bUNION(?:\s+ALL|\s+DISTINCT)?\b")?,
    })
  }

  pub fn check(&self, sql: &str) -> Result<(), Rejection> {
    let sql = sql.trim();
    if sql.is_empty() {
      return Err(Rejection::Empty);
    }

    let found: BTreeSet<String> = self
      .blocked
      .find_iter(sql)
      .map(|m| m.as_str().to_uppercase())
      .collect();
    if let Some(keyword) = BLOCKED_KEYWORDS.iter().find(|k| found.contains(**k))
    {
      return Err(Rejection::Blocked(*keyword));
    }

    if !starts_with_select(sql) {
      return Err(Rejection::NotSelect);
    }

    let semicolons = sql.matches(';').count();
    if semicolons > 1 || (semicolons == 1 && !sql.ends_with(';')) {
      return Err(Rejection::MultipleStatements);
    }

    for part in self.union.split(sql).skip(1) {
      let part = part.trim_start().trim_start_matches('(');
      if !part.trim().is_empty() && !starts_with_select(part) {
        return Err(Rejection::UnsafeUnion);
      }
    }

    Ok(())
  }
}

fn starts_with_select(sql: &str) -> bool {
  sql
    .trim_start()
    .get(..6)
    .is_some_and(|head| head.eq_ignore_ascii_case("SELECT"))
}
