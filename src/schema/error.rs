//! Errors raised while mutating the in-memory schema model

use std::fmt;
use thiserror::Error;

/// Kind of schema object named in a [`SchemaError::DuplicateName`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Column,
    Index,
    ForeignKey,
    PrimaryKey,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Table => "table",
            ObjectKind::Column => "column",
            ObjectKind::Index => "index",
            ObjectKind::ForeignKey => "foreign key",
            ObjectKind::PrimaryKey => "primary key",
        };
        f.write_str(name)
    }
}

/// Schema model errors
///
/// These surface during planning, before any SQL reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Table is not part of the model
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// Column is not part of the table
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Index is not defined on the table
    #[error("unknown index '{index}' on table '{table}'")]
    UnknownIndex { table: String, index: String },

    /// Foreign key is not defined on the table
    #[error("unknown foreign key '{name}' on table '{table}'")]
    UnknownForeignKey { table: String, name: String },

    /// Name clashes with an existing object in the same scope
    #[error("{kind} '{name}' already exists in {scope}")]
    DuplicateName {
        kind: ObjectKind,
        name: String,
        scope: String,
    },

    /// Table has no primary key to drop
    #[error("table '{0}' has no primary key")]
    MissingPrimaryKey(String),

    /// Object is still referenced by a foreign key
    #[error("{object} is referenced by foreign key '{foreign_key}' on table '{referencing_table}'")]
    Referenced {
        object: String,
        referencing_table: String,
        foreign_key: String,
    },

    /// Name is not a plain SQL identifier
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// Definition is structurally invalid (empty column list, bad type, ...)
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
}

impl SchemaError {
    pub(crate) fn duplicate(kind: ObjectKind, name: &str, scope: impl Into<String>) -> Self {
        SchemaError::DuplicateName {
            kind,
            name: name.to_string(),
            scope: scope.into(),
        }
    }

    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        SchemaError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
