//! Checksum of an applied prefix of refactorings

use crate::migration::MigrationError;
use crate::refactor::Refactoring;
use sha2::{Digest, Sha256};

/// Calculate the SHA-256 checksum of a sequence of refactorings
///
/// Each refactoring is serialized to its canonical JSON form and the lines
/// are joined with `\n`, so editing, removing or reordering any applied
/// refactoring changes the result. Formatting of the changelog file does not.
pub fn calculate_checksum(refactorings: &[Refactoring]) -> Result<String, MigrationError> {
    let lines = refactorings
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MigrationError::InvalidFormat(format!("cannot serialize refactoring: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(lines.join("\n").as_bytes());
    let hash = hasher.finalize();

    Ok(format!("{hash:x}"))
}

/// Compare the stored checksum of the first `version` refactorings with the current one
pub fn validate_checksum(version: usize, stored: &str, current: &str) -> Result<(), MigrationError> {
    if stored == current {
        Ok(())
    } else {
        Err(MigrationError::ChecksumMismatch {
            version,
            stored: stored.to_string(),
            current: current.to_string(),
        })
    }
}
