//! Query-side helpers: schema repair, the read-only guard, fixed templates
//! and interpretation of SQL-agent runs.

pub mod agent;
pub mod error;
pub mod guard;
pub mod repair;
pub mod template;

pub use self::{
  agent::{AgentInterpreter, AgentOutcome, Interpretation},
  error::{Error, Result},
  guard::{ReadOnlyGuard, Rejection},
  repair::{SchemaRepair, default_schema_map},
  template::{Template, TemplateMatcher},
};
