//! Artifact persistence.
//!
//! Both files are replaced atomically: the new content is written to a
//! temporary file in the destination directory and then renamed over the
//! target, so readers see either the old or the new document, never a mix.

use std::{
  fs,
  io::Write,
  path::{Path, PathBuf},
};

use loanlytics_core::artifact::KnowledgeArtifact;
use tempfile::NamedTempFile;

use crate::{
  error::{Error, Result},
  fingerprint::fingerprint,
  pipeline::MiningRun,
};

/// Where the artifact and its run summary live.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
  artifact_path: PathBuf,
  summary_path:  PathBuf,
}

impl ArtifactStore {
  pub fn new(
    artifact_path: impl Into<PathBuf>,
    summary_path: impl Into<PathBuf>,
  ) -> Self {
    Self {
      artifact_path: artifact_path.into(),
      summary_path:  summary_path.into(),
    }
  }

  pub fn artifact_path(&self) -> &Path { &self.artifact_path }

  pub fn summary_path(&self) -> &Path { &self.summary_path }

  /// Persist the artifact and summary of `run`. Returns the fingerprint of
  /// the artifact bytes written.
  pub fn save(&self, run: &MiningRun) -> Result<String> {
    let bytes = run.artifact.to_json_pretty()?;
    let digest = fingerprint(&bytes);
    write_atomic(&self.artifact_path, &bytes)?;

    let mut summary = run.summary.clone();
    summary.fingerprint = Some(digest.clone());
    write_atomic(&self.summary_path, &serde_json::to_vec_pretty(&summary)?)?;

    tracing::info!(
      path = %self.artifact_path.display(),
      fingerprint = %digest,
      "knowledge artifact written"
    );
    Ok(digest)
  }

  /// Read the artifact back together with the fingerprint of its bytes.
  pub fn load(&self) -> Result<(KnowledgeArtifact, String)> {
    load_artifact(&self.artifact_path)
  }
}

/// Read an artifact file and fingerprint its bytes.
pub fn load_artifact(path: &Path) -> Result<(KnowledgeArtifact, String)> {
  let bytes = fs::read(path).map_err(|source| Error::Io {
    path: path.to_path_buf(),
    source,
  })?;
  let artifact = KnowledgeArtifact::from_slice(&bytes)?;
  Ok((artifact, fingerprint(&bytes)))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
  let io_err = |source| Error::Io {
    path: path.to_path_buf(),
    source,
  };

  let dir = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir).map_err(io_err)?;

  let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
  tmp.write_all(bytes).map_err(io_err)?;
  tmp.as_file().sync_all().map_err(io_err)?;
  tmp.persist(path).map_err(|source| Error::Persist {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(())
}
