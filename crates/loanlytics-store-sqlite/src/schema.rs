//! SQL schema for the report catalog.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per historical report definition. `query` may be NULL or blank for
-- reports that were never given SQL; those are kept but never mined.
CREATE TABLE IF NOT EXISTS reports (
    id          INTEGER PRIMARY KEY,
    report_name TEXT NOT NULL,
    query       TEXT
);

PRAGMA user_version = 1;
";
