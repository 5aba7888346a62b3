//! Field extractors. Each one reads the raw query text and returns the
//! values for one [`ReportQueryFact`](loanlytics_core::fact::ReportQueryFact)
//! field; a step that finds nothing returns an empty collection.

use std::collections::BTreeSet;

use loanlytics_core::fact::{
  AggregateFunction, Aggregation, FilterPredicate, JoinClause, JoinKind,
  PredicateKind, SelectColumn, TableRef,
};
use regex::Regex;

use crate::{
  clause::{
    clause_body, closing_paren, first_top_level, nested_clause_body,
    split_top_level, truncate_chars,
  },
  error::{Error, Result},
};

pub(crate) const JOIN_CONDITION_LEN: usize = 100;
pub(crate) const COLUMN_EXPRESSION_LEN: usize = 100;
pub(crate) const AGGREGATION_EXPRESSION_LEN: usize = 100;
pub(crate) const FRAGMENT_LEN: usize = 50;
pub(crate) const MAX_COLUMNS: usize = 50;
pub(crate) const MAX_FILTERS: usize = 20;
pub(crate) const MAX_GROUP_BY: usize = 10;
pub(crate) const MAX_ORDER_BY: usize = 5;

/// Words that can follow a table name without being its alias.
const RESERVED: &[&str] = &[
  "AND", "AS", "CROSS", "FOR", "FORCE", "FROM", "FULL", "GROUP", "HAVING",
  "IGNORE", "INNER", "INTO", "JOIN", "LEFT", "LIMIT", "NATURAL", "NOT", "ON",
  "OR", "ORDER", "OUTER", "RIGHT", "SELECT", "SET", "STRAIGHT_JOIN", "UNION",
  "USE", "USING", "VALUES", "WHERE", "WINDOW",
];

fn is_reserved(word: &str) -> bool {
  RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

const TABLE_REF: &str = r"(?i)\b(?:FROM|JOIN)\s+(\w+(?:\.\w+)?)";
const JOIN_HEAD: &str = r"(?i)\b(?:(INNER|LEFT|RIGHT|FULL|CROSS|OUTER)\s+)?(?:OUTER\s+)?JOIN\s+(\w+(?:\.\w+)?)";
const ALIAS: &str = r"(?i)^\s+(?:AS\s+)?([A-Za-z_]\w*)";
const ON_KEYWORD: &str = r"(?i)^\s+ON\b";
const CONDITION_END: &str = r"(?i)\b(?:JOIN|INNER|LEFT|RIGHT|FULL|CROSS|OUTER|WHERE|GROUP|ORDER|HAVING|LIMIT|UNION)\b|;";
const SELECT_HEAD: &str = r"(?i)\bSELECT\b(?:\s+DISTINCT\b)?";
const SELECT_END: &str = r"(?i)\bFROM\b";
const TRAILING_NAME: &str = r"([A-Za-z_]\w*)\s*$";
const LEADING_NAME: &str = r"(?:\w+\.)?(\w+)";
const AGGREGATE_CALL: &str =
  r"(?i)\b(SUM|COUNT|AVG|MAX|MIN|GROUP_CONCAT)\s*\(";
const CALL_ALIAS: &str = r"(?i)^\s+AS\s+(\w+)";
const WHERE_HEAD: &str = r"(?i)\bWHERE\b";
const WHERE_END: &str = r"(?i)\b(?:GROUP\s+BY|HAVING|ORDER\s+BY|LIMIT|UNION)\b|;";
const GROUP_HEAD: &str = r"(?i)\bGROUP\s+BY\b";
const GROUP_END: &str = r"(?i)\b(?:HAVING|ORDER\s+BY|LIMIT|UNION)\b|;";
const ORDER_HEAD: &str = r"(?i)\bORDER\s+BY\b";
const ORDER_END: &str = r"(?i)\b(?:LIMIT|UNION)\b|;";

/// Predicate shapes, scanned in this order.
const FILTER_SHAPES: &[(&str, PredicateKind)] = &[
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s*=", PredicateKind::Equality),
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s+IN\s*\(", PredicateKind::InList),
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s+LIKE\s", PredicateKind::Like),
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s+BETWEEN\s", PredicateKind::Between),
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s+IS\s+NULL\b", PredicateKind::IsNull),
  (
    r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s+IS\s+NOT\s+NULL\b",
    PredicateKind::IsNotNull,
  ),
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s*>", PredicateKind::GreaterThan),
  (r"(?i)\b([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)?)\s*<", PredicateKind::LessThan),
];

fn compile(pattern: &'static str) -> Result<Regex> {
  Regex::new(pattern).map_err(|source| Error::Pattern { pattern, source })
}

// ─── Compiled pattern set ────────────────────────────────────────────────────

/// Every regex the extractors need, compiled once.
pub(crate) struct Patterns {
  table_ref:      Regex,
  join_head:      Regex,
  alias:          Regex,
  on_keyword:     Regex,
  condition_end:  Regex,
  select_head:    Regex,
  select_end:     Regex,
  trailing_name:  Regex,
  leading_name:   Regex,
  aggregate_call: Regex,
  call_alias:     Regex,
  where_head:     Regex,
  where_end:      Regex,
  group_head:     Regex,
  group_end:      Regex,
  order_head:     Regex,
  order_end:      Regex,
  filters:        Vec<(Regex, PredicateKind)>,
}

impl Patterns {
  pub(crate) fn compile() -> Result<Self> {
    let filters = FILTER_SHAPES
      .iter()
      .map(|(pattern, kind)| Ok((compile(pattern)?, *kind)))
      .collect::<Result<Vec<_>>>()?;

    Ok(Self {
      table_ref: compile(TABLE_REF)?,
      join_head: compile(JOIN_HEAD)?,
      alias: compile(ALIAS)?,
      on_keyword: compile(ON_KEYWORD)?,
      condition_end: compile(CONDITION_END)?,
      select_head: compile(SELECT_HEAD)?,
      select_end: compile(SELECT_END)?,
      trailing_name: compile(TRAILING_NAME)?,
      leading_name: compile(LEADING_NAME)?,
      aggregate_call: compile(AGGREGATE_CALL)?,
      call_alias: compile(CALL_ALIAS)?,
      where_head: compile(WHERE_HEAD)?,
      where_end: compile(WHERE_END)?,
      group_head: compile(GROUP_HEAD)?,
      group_end: compile(GROUP_END)?,
      order_head: compile(ORDER_HEAD)?,
      order_end: compile(ORDER_END)?,
      filters,
    })
  }

  /// The alias written directly after a table reference, unless it is a
  /// reserved clause keyword.
  fn alias_after(&self, rest: &str) -> (Option<String>, usize) {
    match self.alias.captures(rest) {
      Some(caps) if !is_reserved(&caps[1]) => {
        (Some(caps[1].to_lowercase()), caps[0].len())
      }
      _ => (None, 0),
    }
  }

  // ── Tables ────────────────────────────────────────────────────────────

  pub(crate) fn tables(&self, sql: &str) -> BTreeSet<TableRef> {
    self
      .table_ref
      .captures_iter(sql)
      .filter_map(|caps| {
        let name = caps.get(1).filter(|m| !is_reserved(m.as_str()))?;
        let (alias, _) = self.alias_after(&sql[name.end()..]);
        Some(TableRef {
          name: name.as_str().to_lowercase(),
          alias,
        })
      })
      .collect()
  }

  // ── Joins ─────────────────────────────────────────────────────────────

  pub(crate) fn joins(&self, sql: &str) -> Vec<JoinClause> {
    let mut joins = Vec::new();
    for caps in self.join_head.captures_iter(sql) {
      let Some(table) = caps.get(2) else { continue };
      let kind = match caps.get(1).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(k) if k == "LEFT" => JoinKind::Left,
        Some(k) if k == "RIGHT" => JoinKind::Right,
        Some(k) if k == "FULL" || k == "OUTER" => JoinKind::Outer,
        _ => JoinKind::Inner,
      };

      let mut rest = &sql[table.end()..];
      let (alias, consumed) = self.alias_after(rest);
      rest = &rest[consumed..];

      let Some(on) = self.on_keyword.find(rest) else { continue };
      rest = &rest[on.end()..];
      let stop = self.condition_end.find(rest).map_or(rest.len(), |m| m.start());
      let condition = rest[..stop].trim();

      joins.push(JoinClause {
        kind,
        table: table.as_str().to_lowercase(),
        alias,
        condition: truncate_chars(condition, JOIN_CONDITION_LEN),
      });
    }
    joins
  }

  // ── Projection ────────────────────────────────────────────────────────

  pub(crate) fn columns(&self, sql: &str) -> Vec<SelectColumn> {
    let Some(head) = first_top_level(sql, &self.select_head) else {
      return Vec::new();
    };
    let rest = &sql[head.end()..];
    let Some(end) = first_top_level(rest, &self.select_end) else {
      return Vec::new();
    };

    split_top_level(&rest[..end.start()])
      .into_iter()
      .take(MAX_COLUMNS)
      .map(|part| SelectColumn {
        expression: truncate_chars(part, COLUMN_EXPRESSION_LEN),
        name:       self.column_name(part),
      })
      .collect()
  }

  /// A trailing identifier (covers both `expr AS alias` and `t.column`),
  /// else the leading name, which for a bare call is the function.
  fn column_name(&self, expression: &str) -> String {
    let name = self
      .trailing_name
      .captures(expression)
      .or_else(|| self.leading_name.captures(expression))
      .and_then(|caps| caps.get(1))
      .map(|m| m.as_str())
      .unwrap_or(expression);
    name.to_lowercase()
  }

  // ── Aggregations ──────────────────────────────────────────────────────

  pub(crate) fn aggregations(&self, sql: &str) -> Vec<Aggregation> {
    let mut aggregations = Vec::new();
    for caps in self.aggregate_call.captures_iter(sql) {
      let (Some(call), Some(name)) = (caps.get(0), caps.get(1)) else {
        continue;
      };
      let Ok(function) = name.as_str().parse::<AggregateFunction>() else {
        continue;
      };
      let open = call.end() - 1;
      let Some(close) = closing_paren(sql, open) else { continue };

      let alias = self
        .call_alias
        .captures(&sql[close + 1..])
        .map(|c| c[1].to_lowercase());

      aggregations.push(Aggregation {
        function,
        expression: truncate_chars(
          &sql[call.start()..=close],
          AGGREGATION_EXPRESSION_LEN,
        ),
        alias,
      });
    }
    aggregations
  }

  // ── Filters ───────────────────────────────────────────────────────────

  /// Predicates of the top-level `WHERE`, else of the first nested one.
  pub(crate) fn filters(&self, sql: &str) -> Vec<FilterPredicate> {
    let Some(clause) = clause_body(sql, &self.where_head, &self.where_end)
      .or_else(|| nested_clause_body(sql, &self.where_head, &self.where_end))
    else {
      return Vec::new();
    };

    self
      .filters
      .iter()
      .flat_map(|(re, kind)| {
        re.captures_iter(clause).filter_map(move |caps| {
          let column = caps.get(1)?.as_str();
          (!is_reserved(column)).then(|| FilterPredicate {
            column: column.to_lowercase(),
            kind:   *kind,
          })
        })
      })
      .take(MAX_FILTERS)
      .collect()
  }

  // ── Grouping / ordering ───────────────────────────────────────────────

  pub(crate) fn group_by(&self, sql: &str) -> Vec<String> {
    fragments(
      clause_body(sql, &self.group_head, &self.group_end),
      MAX_GROUP_BY,
    )
  }

  pub(crate) fn order_by(&self, sql: &str) -> Vec<String> {
    fragments(
      clause_body(sql, &self.order_head, &self.order_end),
      MAX_ORDER_BY,
    )
  }
}

fn fragments(clause: Option<&str>, max: usize) -> Vec<String> {
  clause
    .map(|body| {
      split_top_level(body)
        .into_iter()
        .take(max)
        .map(|p| truncate_chars(p, FRAGMENT_LEN))
        .collect()
    })
    .unwrap_or_default()
}
