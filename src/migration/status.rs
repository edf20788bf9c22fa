//! Migration status tracking

/// A declared refactoring that is not applied yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRefactoring {
    /// Marker value after this refactoring is applied
    pub version: usize,

    pub description: String,
}

/// Where the database stands relative to the declared sequence
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Stored marker
    pub current_version: usize,

    /// Number of declared refactorings
    pub declared: usize,

    /// Descriptions of the applied prefix, in order
    pub applied: Vec<String>,

    /// Not yet applied refactorings, in order
    pub pending: Vec<PendingRefactoring>,

    /// Whether the stored checksum matches the declared prefix
    pub checksum_valid: bool,

    /// Whether another process holds the migration lock
    pub locked: bool,
}

impl MigrationStatus {
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Marker value after the next pending refactoring
    #[must_use]
    pub fn next_pending_version(&self) -> Option<usize> {
        self.pending.first().map(|p| p.version)
    }
}
