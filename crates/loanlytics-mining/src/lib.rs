//! Offline knowledge mining for Loanlytics.
//!
//! Report SQL is analyzed into fact records, the facts are aggregated into
//! per-table pattern statistics, and the statistics are combined with the
//! curated business rules and intent exemplars into one
//! [`KnowledgeArtifact`](loanlytics_core::artifact::KnowledgeArtifact).
//!
//! ```no_run
//! use loanlytics_analyzer::RegexAnalyzer;
//! use loanlytics_mining::{ArtifactStore, MiningPipeline};
//!
//! let pipeline = MiningPipeline::new(RegexAnalyzer::new().unwrap());
//! let run = pipeline.run(&[]).unwrap();
//! ArtifactStore::new("data/knowledge.json", "data/summary.json")
//!   .save(&run)
//!   .unwrap();
//! ```

pub mod aggregate;
pub mod builder;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod rules;
pub mod store;
pub mod summary;

pub use aggregate::{Aggregator, aggregate};
pub use builder::KnowledgeBuilder;
pub use error::{Error, Result};
pub use fingerprint::fingerprint;
pub use pipeline::{MiningPipeline, MiningRun};
pub use store::{ArtifactStore, load_artifact};
pub use summary::MiningSummary;
