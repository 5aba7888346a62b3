//! Interpreting the steps of an external SQL agent.
//!
//! The agent reports the tool calls it made and what each returned. The SQL
//! worth running is the last `SELECT` sent to a SQL tool or, failing that, the
//! first `SELECT` that shows up in a tool's output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  error::{Result, compile},
  repair::SchemaRepair,
};

/// Tools whose input is a SQL query.
pub const SQL_TOOLS: &[&str] = &[
  "sql_db_query",
  "sql_db_query_checker",
  "query_sql_db",
  "query_sql_database",
];

/// Observations outside this length range (exclusive) are not searched.
const OBSERVATION_LEN: (usize, usize) = (20, 2000);
/// Outputs at or under this length count as no answer at all.
const MEANINGFUL_OUTPUT: usize = 10;
const OUTPUT_PREVIEW: usize = 500;
const DETAIL_PREVIEW: usize = 200;
const MAX_DETAILS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentOutcome {
  #[serde(default)]
  pub output: String,
  #[serde(default, alias = "intermediate_steps")]
  pub steps:  Vec<AgentStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentStep {
  pub action:      AgentAction,
  #[serde(default)]
  pub observation: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AgentAction {
  Tool(ToolCall),
  Unrecognized(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
  #[serde(alias = "tool_name")]
  pub tool:       String,
  #[serde(default, alias = "tool_input_str")]
  pub tool_input: Option<ToolInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ToolInput {
  Text(String),
  Query { query: String },
  Other(Value),
}

impl ToolInput {
  fn query(&self) -> Option<&str> {
    match self {
      ToolInput::Text(text) => Some(text),
      ToolInput::Query { query } => Some(query),
      ToolInput::Other(_) => None,
    }
  }
}

/// What a run of the agent amounts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interpretation {
  /// SQL was found; `sql` has schema prefixes repaired.
  Sql {
    sql:     String,
    changed: bool,
  },
  /// The agent answered in prose but produced no SQL.
  NonAnswer {
    message: String,
    hints:   Vec<String>,
    output:  String,
  },
  /// Nothing usable.
  Empty {
    message: String,
    details: Vec<String>,
  },
}

fn observation_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn has_select(text: &str) -> bool { text.to_uppercase().contains("SELECT") }

fn preview(text: &str, n: usize) -> String { text.chars().take(n).collect() }

pub struct AgentInterpreter {
  embedded_sql: Regex,
}

impl AgentInterpreter {
  pub fn new() -> Result<Self> {
    Ok(Self {
      embedded_sql: compile(r"(?is)SELECT.*?(?:;|$)")?,
    })
  }

  /// The SQL the agent settled on, if any.
  pub fn extract_sql(&self, outcome: &AgentOutcome) -> Option<String> {
    let mut from_tool = None;
    let mut from_observation = None;

    for step in &outcome.steps {
      if let AgentAction::Tool(call) = &step.action
        && SQL_TOOLS.contains(&call.tool.as_str())
        && let Some(query) = call.tool_input.as_ref().and_then(ToolInput::query)
        && has_select(query)
      {
        from_tool = Some(query.to_owned());
      }

      if from_observation.is_some() {
        continue;
      }
      let text = observation_text(&step.observation);
      let len = text.chars().count();
      if len > OBSERVATION_LEN.0 && len < OBSERVATION_LEN.1 && has_select(&text) {
        from_observation = self
          .embedded_sql
          .find(&text)
          .map(|m| m.as_str().trim().to_owned())
          .filter(|sql| !sql.is_empty());
      }
    }

    from_tool.or(from_observation)
  }

  pub fn interpret(
    &self,
    outcome: &AgentOutcome,
    repair: &SchemaRepair,
  ) -> Interpretation {
    if let Some(sql) = self.extract_sql(outcome) {
      let repaired = repair.repair(&sql);
      let changed = repaired != sql.as_str();
      if changed {
        tracing::info!("added schema prefixes to agent sql");
      }
      return Interpretation::Sql {
        sql: repaired.into_owned(),
        changed,
      };
    }

    if outcome.output.chars().count() > MEANINGFUL_OUTPUT {
      return non_answer(&outcome.output);
    }

    let details: Vec<String> = outcome
      .steps
      .iter()
      .enumerate()
      .filter_map(|(i, step)| {
        let text = observation_text(&step.observation);
        let lower = text.to_lowercase();
        (lower.contains("error") || lower.contains("failed"))
          .then(|| format!("Step {i}: {}", preview(&text, DETAIL_PREVIEW)))
      })
      .take(MAX_DETAILS)
      .collect();

    let mut message =
      String::from("Cannot answer this question with available data.");
    if !details.is_empty() {
      message.push_str(&format!(" Details: {}", details.join("; ")));
    }
    Interpretation::Empty { message, details }
  }
}

fn non_answer(output: &str) -> Interpretation {
  let lower = output.to_lowercase();
  let mut hints = Vec::new();
  if lower.contains("error") || lower.contains("failed") {
    hints.push(
      "The agent encountered an error while processing your question."
        .to_owned(),
    );
  }
  if lower.contains("table") && lower.contains("not found") {
    hints.push(
      "The requested table may not exist or may not be accessible.".to_owned(),
    );
  }
  if lower.contains("syntax") || lower.contains("invalid") {
    hints
      .push("There may be a syntax issue with the generated query.".to_owned());
  }

  let mut message = String::from("Could not generate query for this question.");
  if hints.is_empty() {
    message.push_str(" The database structure may not support this query.");
  } else {
    message.push(' ');
    message.push_str(&hints.join(" "));
  }

  Interpretation::NonAnswer {
    message,
    hints,
    output: preview(output, OUTPUT_PREVIEW),
  }
}
