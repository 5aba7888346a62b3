//! Artifact fingerprints.
//!
//! A fingerprint is the lowercase hex SHA-256 of the exact bytes written to
//! disk. Artifacts serialise deterministically, so rebuilding from the same
//! reports yields the same fingerprint.

use sha2::{Digest, Sha256};

/// Compute the fingerprint of serialised artifact bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_digest() {
    assert_eq!(
      fingerprint(b""),
      "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
  }

  #[test]
  fn content_changes_fingerprint() {
    assert_ne!(fingerprint(b"{}"), fingerprint(b"{ }"));
    assert_eq!(fingerprint(b"{}"), fingerprint(b"{}"));
  }
}
