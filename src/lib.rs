//! # Revolt
//!
//! Declarative schema refactorings rendered per SQL dialect, applied by a
//! versioned, lock-protected migration engine.
//!
//! A changelog is an ordered list of [`Refactoring`]s. Each one first updates
//! an in-memory [`Database`] model (rejecting changes that do not fit it) and
//! is then rendered to a [`Script`] by a [`Dialect`]. The [`Migrator`] keeps
//! a marker of how many refactorings were applied and runs the rest.

pub mod config;
#[cfg(feature = "postgres")]
pub mod connection;
pub mod dialect;
pub mod executor;
pub mod migration;
pub mod refactor;
pub mod schema;
pub mod script;
pub mod transaction;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::DatabaseConfig;
#[cfg(feature = "postgres")]
pub use connection::{connect, ConnectionError};
pub use dialect::{Dialect, DialectError, DialectKind, MysqlDialect, PostgresDialect, SqliteDialect};
#[cfg(feature = "postgres")]
pub use executor::MayPostgresExecutor;
pub use executor::{ExecutorError, SchemaExecutor, SqlValue};
pub use migration::{MigrationError, MigrationReport, MigrationStatus, Migrator};
pub use refactor::Refactoring;
pub use schema::{Column, ColumnChange, ColumnPosition, ColumnType, Database, SchemaError, Table};
pub use script::Script;
pub use transaction::{Transaction, TransactionError};
