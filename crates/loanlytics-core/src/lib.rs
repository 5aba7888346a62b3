//! Core types and trait definitions for Loanlytics.
//!
//! This crate holds the data model shared by the mining pipeline and the
//! serving side: fact records, per-table pattern statistics, and the knowledge
//! artifact that connects the two. No IO happens here; the analyzer, catalog
//! and persistence live in sibling crates behind the traits declared here.

// Catalog backends implement the trait with native `async fn`.
#![allow(async_fn_in_trait)]

pub mod analyzer;
pub mod artifact;
pub mod capped;
pub mod catalog;
pub mod error;
pub mod fact;
pub mod pattern;
pub mod report;

pub use error::{Error, Result};
