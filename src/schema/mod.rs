//! In-memory schema model
//!
//! The model mirrors the desired state of the target database. Refactorings
//! mutate it so that later refactorings in the same run see the cumulative
//! schema (a rename followed by an index must index the renamed column).
//!
//! Ownership is flat: the [`Database`] owns its tables by value, tables own
//! their columns, indexes and constraints, and every cross reference is a
//! name looked up on demand.

mod column;
mod database;
mod error;
mod table;

pub use column::{Column, ColumnChange, ColumnPosition, ColumnType, TypeKind};
pub use database::Database;
pub use error::{ObjectKind, SchemaError};
pub use table::{ForeignKey, Index, OnDelete, PrimaryKey, Table};

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Check that `name` is a plain SQL identifier
///
/// Quoting is left to the dialect, but names are restricted to
/// `[A-Za-z_][A-Za-z0-9_]*` so that every dialect can render them.
pub fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        for ok in ["users", "_tmp", "order_items2", "A"] {
            assert!(validate_identifier(ok).is_ok(), "should accept {ok}");
        }
        for bad in ["", "2fast", "drop table", "a-b", "x;y", "naïve"] {
            assert_eq!(
                validate_identifier(bad),
                Err(SchemaError::InvalidIdentifier(bad.to_string()))
            );
        }
    }
}
