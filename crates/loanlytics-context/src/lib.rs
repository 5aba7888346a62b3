//! Knowledge context provider for Loanlytics.
//!
//! Loads the mined knowledge artifact and turns it into short textual hints
//! that are prepended to a question before it is handed to the SQL agent.

pub mod handle;
pub mod provider;

pub use handle::KnowledgeHandle;
pub use provider::{KnowledgeContext, classify_intent};
