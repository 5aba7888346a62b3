//! `loanlytics`: mine report SQL into a knowledge artifact and serve it.
//!
//! # Usage
//!
//! ```text
//! loanlytics import reports.json
//! loanlytics mine
//! loanlytics enrich "top 10 customers by loan amount"
//! loanlytics --config /etc/loanlytics.toml serve
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use loanlytics_analyzer::RegexAnalyzer;
use loanlytics_api::{AppState, QueryTools};
use loanlytics_context::{KnowledgeContext, KnowledgeHandle};
use loanlytics_core::{catalog::ReportCatalog, report::ReportRecord};
use loanlytics_mining::{ArtifactStore, MiningPipeline};
use loanlytics_query::{ReadOnlyGuard, SchemaRepair, TemplateMatcher};
use loanlytics_store_sqlite::SqliteCatalog;
use settings::Settings;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Loan report knowledge miner")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "loanlytics.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Load a JSON export of `{id, report_name, query}` records into the
  /// catalog.
  Import { file: PathBuf },
  /// Analyze every catalog report and write the knowledge artifact.
  Mine,
  /// Print the fact record for one SQL text.
  Analyze {
    #[arg(short, long, default_value = "adhoc")]
    name: String,
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    sql:  Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
  },
  /// Print mined hints for a table.
  Context { table: String },
  /// Print a question enriched with rules and a matching exemplar.
  Enrich { question: String },
  /// Add missing schema prefixes to a query.
  Repair { sql: String },
  /// Repair a query and check that it is a single read-only SELECT.
  Check { sql: String },
  /// Print the fixed template answering a question, if any.
  Template { question: String },
  /// Serve the HTTP API.
  Serve,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Import { file } => import(&settings, file).await,
    Command::Mine => mine(&settings).await,
    Command::Analyze { name, sql, file } => analyze(&name, sql, file),
    Command::Context { table } => {
      let context = KnowledgeContext::load(&settings.artifact_path);
      let hints = context.context_for_table(&table);
      if hints.is_empty() {
        println!("no mined context for {table}");
      } else {
        println!("{hints}");
      }
      Ok(())
    }
    Command::Enrich { question } => {
      let context = KnowledgeContext::load(&settings.artifact_path);
      println!("{}", context.enrich(Some(&question)));
      Ok(())
    }
    Command::Repair { sql } => {
      let repair = SchemaRepair::new(settings.schema_map)?;
      println!("{}", repair.repair(&sql));
      Ok(())
    }
    Command::Check { sql } => {
      let repair = SchemaRepair::new(settings.schema_map)?;
      let sql = repair.repair(&sql);
      if let Err(rejection) = ReadOnlyGuard::new()?.check(&sql) {
        bail!("{rejection}");
      }
      println!("{sql}");
      Ok(())
    }
    Command::Template { question } => {
      match TemplateMatcher::new()?.find(&question) {
        Some(template) => println!("-- {}\n{}", template.name, template.sql),
        None => bail!("no template matches this question"),
      }
      Ok(())
    }
    Command::Serve => serve(settings).await,
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn open_catalog(settings: &Settings) -> Result<SqliteCatalog> {
  let path = &settings.catalog_path;
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  SqliteCatalog::open(path)
    .await
    .with_context(|| format!("failed to open catalog at {path:?}"))
}

async fn import(settings: &Settings, file: PathBuf) -> Result<()> {
  let raw = std::fs::read(&file)
    .with_context(|| format!("reading {}", file.display()))?;
  let reports: Vec<ReportRecord> =
    serde_json::from_slice(&raw).context("parsing report export")?;

  let catalog = open_catalog(settings).await?;
  let written = catalog.import(reports).await?;
  let total = catalog.count_reports().await?;
  println!("imported {written} reports ({total} in catalog)");
  Ok(())
}

async fn mine(settings: &Settings) -> Result<()> {
  let catalog = open_catalog(settings).await?;
  let reports = catalog.list_reports().await?;
  if reports.is_empty() {
    tracing::warn!("catalog has no reports with SQL");
  }

  let pipeline = MiningPipeline::new(RegexAnalyzer::new()?);
  let run = pipeline.run(&reports)?;
  let store =
    ArtifactStore::new(&settings.artifact_path, &settings.summary_path);
  let fingerprint = store.save(&run)?;

  let summary = &run.summary;
  println!(
    "analyzed {}/{} reports, {} tables, avg {:.1} joins (max {})",
    summary.analyzed_reports,
    summary.total_reports,
    run.patterns.len(),
    summary.avg_joins,
    summary.max_joins,
  );
  for table in summary.most_used_tables.iter().take(10) {
    println!("  {:<40} {}", table.name, table.count);
  }
  println!("artifact {} ({fingerprint})", store.artifact_path().display());
  Ok(())
}

fn analyze(name: &str, sql: Option<String>, file: Option<PathBuf>) -> Result<()> {
  let sql = match (sql, file) {
    (Some(sql), _) => sql,
    (None, Some(file)) => std::fs::read_to_string(&file)
      .with_context(|| format!("reading {}", file.display()))?,
    (None, None) => bail!("either --sql or --file is required"),
  };
  let fact = RegexAnalyzer::new()?.analyze(name, &sql)?;
  println!("{}", serde_json::to_string_pretty(&fact)?);
  Ok(())
}

async fn serve(settings: Settings) -> Result<()> {
  let catalog = open_catalog(&settings).await?;
  let knowledge = Arc::new(KnowledgeHandle::new(&settings.artifact_path));
  // Load before accepting requests so no handler blocks on file IO.
  if !knowledge.get().is_available() {
    tracing::warn!("serving without knowledge context");
  }

  let state = AppState {
    catalog: Arc::new(catalog),
    knowledge,
    tools: Arc::new(QueryTools::new(settings.schema_map.clone())?),
  };

  let app = loanlytics_api::router(state);
  let address = format!("{}:{}", settings.host, settings.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
