//! Migration-specific error types

use crate::dialect::DialectError;
use crate::executor::ExecutorError;
use crate::schema::SchemaError;
use crate::transaction::TransactionError;

/// Migration-specific errors
///
/// `version` fields are 1-based positions in the declared sequence, i.e. the
/// marker value the refactoring would produce.
#[derive(Debug)]
pub enum MigrationError {
    /// Bookkeeping query failed
    Database(ExecutorError),
    /// Could not open, commit or roll back a transaction
    Transaction(TransactionError),
    /// Refactoring does not fit the schema model
    Schema {
        version: usize,
        description: String,
        error: SchemaError,
    },
    /// Refactoring cannot be rendered for the dialect
    Unsupported {
        version: usize,
        description: String,
        error: DialectError,
    },
    /// A statement failed while applying a refactoring
    StatementExecution {
        version: usize,
        description: String,
        statement: String,
        error: String,
    },
    /// Stored marker is beyond the declared sequence
    VersionConflict { stored: i64, declared: usize },
    /// Applied prefix differs from what was recorded
    ChecksumMismatch {
        version: usize,
        stored: String,
        current: String,
    },
    /// Migration lock timeout
    LockTimeout(String),
    /// Refactoring has no inverse
    Irreversible { version: usize, description: String },
    /// Stored bookkeeping data is malformed
    InvalidFormat(String),
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {e}"),
            MigrationError::Transaction(e) => write!(f, "Transaction error: {e}"),
            MigrationError::Schema {
                version,
                description,
                error,
            } => write!(f, "Refactoring {version} ({description}) is invalid: {error}"),
            MigrationError::Unsupported {
                version,
                description,
                error,
            } => write!(f, "Refactoring {version} ({description}) cannot be rendered: {error}"),
            MigrationError::StatementExecution {
                version,
                description,
                statement,
                error,
            } => {
                write!(
                    f,
                    "Refactoring {version} ({description}) failed and was rolled back.\n\
                     Statement: {statement}\n\
                     Error: {error}"
                )
            }
            MigrationError::VersionConflict { stored, declared } => {
                write!(
                    f,
                    "Database is at version {stored} but only {declared} refactoring(s) are declared.\n\
                     The changelog is older than the database or refactorings were removed."
                )
            }
            MigrationError::ChecksumMismatch {
                version,
                stored,
                current,
            } => {
                write!(
                    f,
                    "The first {version} refactoring(s) were modified after being applied.\n\
                     Stored checksum: {stored}\n\
                     Current checksum: {current}"
                )
            }
            MigrationError::LockTimeout(msg) => write!(f, "Migration lock timeout: {msg}"),
            MigrationError::Irreversible { version, description } => {
                write!(f, "Refactoring {version} ({description}) cannot be reverted")
            }
            MigrationError::InvalidFormat(msg) => write!(f, "Invalid bookkeeping data: {msg}"),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Database(e) => Some(e),
            MigrationError::Transaction(e) => Some(e),
            MigrationError::Schema { error, .. } => Some(error),
            MigrationError::Unsupported { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ExecutorError> for MigrationError {
    fn from(error: ExecutorError) -> Self {
        MigrationError::Database(error)
    }
}

impl From<TransactionError> for MigrationError {
    fn from(error: TransactionError) -> Self {
        MigrationError::Transaction(error)
    }
}
