//! Runtime settings, layered from an optional TOML file and `LOANLYTICS_*`
//! environment variables.

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::Context as _;
use loanlytics_query::default_schema_map;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  #[serde(default = "default_catalog_path")]
  pub catalog_path:  PathBuf,
  #[serde(default = "default_artifact_path")]
  pub artifact_path: PathBuf,
  #[serde(default = "default_summary_path")]
  pub summary_path:  PathBuf,
  /// Table → schema lookup for prefix repair.
  #[serde(default = "default_schema_map")]
  pub schema_map:    BTreeMap<String, String>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 5000 }
fn default_catalog_path() -> PathBuf { PathBuf::from("data/reports.db") }
fn default_artifact_path() -> PathBuf { PathBuf::from("data/knowledge.json") }
fn default_summary_path() -> PathBuf {
  PathBuf::from("data/mining_summary.json")
}

impl Settings {
  /// Read `path` if it exists, then apply environment overrides.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LOANLYTICS").try_parsing(true))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.artifact_path, PathBuf::from("data/knowledge.json"));
    assert_eq!(settings.schema_map.get("loan_accounts").unwrap(), "financialForms");
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loanlytics.toml");
    std::fs::write(
      &path,
      "port = 9090\nartifact_path = \"/tmp/k.json\"\n\n[schema_map]\nledger = \"core\"\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    assert_eq!(settings.port, 9090);
    assert_eq!(settings.artifact_path, PathBuf::from("/tmp/k.json"));
    assert_eq!(settings.schema_map.len(), 1);
    assert_eq!(settings.schema_map["ledger"], "core");
    assert_eq!(settings.host, "127.0.0.1");
  }
}
