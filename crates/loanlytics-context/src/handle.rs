//! Lazily loaded, shared knowledge context.

use std::{path::PathBuf, sync::OnceLock};

use crate::provider::KnowledgeContext;

/// Loads the artifact on first use, exactly once.
///
/// Concurrent first callers block until the single load finishes and then
/// all observe the same context. The handle is meant to be built once and
/// passed to whoever needs it (e.g. inside an `Arc` in HTTP state).
#[derive(Debug)]
pub struct KnowledgeHandle {
  path: PathBuf,
  cell: OnceLock<KnowledgeContext>,
}

impl KnowledgeHandle {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      cell: OnceLock::new(),
    }
  }

  /// A handle that already holds `context`; the path is never read.
  pub fn preloaded(context: KnowledgeContext) -> Self {
    Self {
      path: PathBuf::new(),
      cell: OnceLock::from(context),
    }
  }

  pub fn get(&self) -> &KnowledgeContext {
    self.cell.get_or_init(|| {
      tracing::debug!(path = %self.path.display(), "loading knowledge artifact");
      KnowledgeContext::load(&self.path)
    })
  }

  pub fn is_loaded(&self) -> bool { self.cell.get().is_some() }
}
