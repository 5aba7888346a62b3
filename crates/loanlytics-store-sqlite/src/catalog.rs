//! [`SqliteCatalog`], the SQLite implementation of [`ReportCatalog`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use loanlytics_core::{catalog::ReportCatalog, report::ReportRecord};

use crate::{Error, Result, schema::SCHEMA};

const UPSERT: &str = "
INSERT INTO reports (id, report_name, query) VALUES (?1, ?2, ?3)
ON CONFLICT(id) DO UPDATE SET report_name = excluded.report_name, query = excluded.query";

fn record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReportRecord> {
  Ok(ReportRecord {
    id:         row.get(0)?,
    name:       row.get(1)?,
    query_text: row.get(2)?,
  })
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// A report catalog backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteCatalog {
  conn: tokio_rusqlite::Connection,
}

impl SqliteCatalog {
  /// Open (or create) a catalog at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let catalog = Self { conn };
    catalog.init_schema().await?;
    Ok(catalog)
  }

  /// Open an in-memory catalog.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let catalog = Self { conn };
    catalog.init_schema().await?;
    Ok(catalog)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Upsert many reports in one transaction. Returns how many were written.
  pub async fn import(&self, reports: Vec<ReportRecord>) -> Result<usize> {
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(UPSERT)?;
          for r in &reports {
            stmt.execute(rusqlite::params![r.id, r.name, r.query_text])?;
          }
        }
        tx.commit()?;
        Ok(reports.len())
      })
      .await?;

    tracing::info!(reports = written, "imported reports");
    Ok(written)
  }
}

// ─── ReportCatalog impl ──────────────────────────────────────────────────────

impl ReportCatalog for SqliteCatalog {
  type Error = Error;

  async fn list_reports(&self) -> Result<Vec<ReportRecord>> {
    let reports = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, report_name, query FROM reports
           WHERE query IS NOT NULL AND TRIM(query) != ''
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map([], record)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(reports)
  }

  async fn get_report(&self, id: i64) -> Result<Option<ReportRecord>> {
    let report = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, report_name, query FROM reports WHERE id = ?1",
              rusqlite::params![id],
              record,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(report)
  }

  async fn put_report(&self, report: ReportRecord) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          UPSERT,
          rusqlite::params![report.id, report.name, report.query_text],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_reports(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM reports", [], |r| r.get(0))?)
      })
      .await?;
    u64::try_from(count).map_err(|_| Error::CountOutOfRange(count))
  }
}
