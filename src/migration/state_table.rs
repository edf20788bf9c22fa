//! The `revolt_version` bookkeeping table
//!
//! One data row (`id = 1`) holds the marker and checksum. The migration
//! lock is a second row (`id = -1`) in the same table.

use crate::dialect::{Dialect, DialectKind};
use crate::executor::SchemaExecutor;
use crate::migration::{MigrationError, VersionRecord, VERSION_TABLE};
use chrono::{DateTime, Utc};
use sea_query::{ColumnDef, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder, Table, TableCreateStatement};

/// Id of the row carrying the marker
pub const VERSION_ROW_ID: i64 = 1;

/// `CREATE TABLE IF NOT EXISTS` statement for the bookkeeping table
pub fn create_state_table(table: &'static str) -> TableCreateStatement {
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new("id")
                .integer()
                .not_null()
                .primary_key()
        )
        .col(
            ColumnDef::new("version")
                .big_integer()
                .not_null()
        )
        .col(
            ColumnDef::new("checksum")
                .string()
                .string_len(64)
                .not_null()
        )
        .col(
            ColumnDef::new("updated_at")
                .timestamp()
                .null()
        )
        .to_owned()
}

/// Render [`create_state_table`] with the query builder of `kind`
pub fn create_table_sql(kind: DialectKind, table: &'static str) -> String {
    let statement = create_state_table(table);
    match kind {
        DialectKind::Postgres => statement.build(PostgresQueryBuilder),
        DialectKind::Mysql => statement.build(MysqlQueryBuilder),
        DialectKind::Sqlite => statement.build(SqliteQueryBuilder),
    }
}

/// Create the bookkeeping table and its version row when missing
///
/// Both statements are idempotent, so this runs on every status, up and down.
pub fn initialize_state_table(executor: &dyn SchemaExecutor, dialect: &dyn Dialect) -> Result<(), MigrationError> {
    executor.execute(&dialect.create_version_table(VERSION_TABLE))?;
    executor.execute(&dialect.insert_ignore(
        VERSION_TABLE,
        &["id", "version", "checksum"],
        &[VERSION_ROW_ID.to_string(), "0".to_string(), "''".to_string()],
    ))?;
    Ok(())
}

/// Query counting tables named `table` in the current schema
pub fn table_exists_sql(kind: DialectKind, table: &str) -> String {
    match kind {
        DialectKind::Postgres => format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = '{table}'"
        ),
        DialectKind::Mysql => format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = '{table}'"
        ),
        DialectKind::Sqlite => format!("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{table}'"),
    }
}

/// Whether the bookkeeping table exists, without creating it
pub fn state_table_exists(executor: &dyn SchemaExecutor, dialect: &dyn Dialect) -> Result<bool, MigrationError> {
    let count = executor
        .query_row(&table_exists_sql(dialect.kind(), VERSION_TABLE))?
        .and_then(|row| row.first().and_then(|v| v.as_i64()))
        .unwrap_or(0);
    Ok(count > 0)
}

/// Read the stored marker; `None` when the version row is missing
pub fn read_version(executor: &dyn SchemaExecutor) -> Result<Option<VersionRecord>, MigrationError> {
    let sql = format!("SELECT version, checksum FROM {VERSION_TABLE} WHERE id = {VERSION_ROW_ID}");
    executor
        .query_row(&sql)?
        .map(|row| VersionRecord::from_row(&row))
        .transpose()
}

/// `UPDATE` moving the marker to `version`
pub fn version_update_sql(dialect: &dyn Dialect, version: usize, checksum: &str, at: DateTime<Utc>) -> String {
    format!(
        "UPDATE {VERSION_TABLE} SET version = {version}, checksum = '{checksum}', updated_at = {} WHERE id = {VERSION_ROW_ID}",
        dialect.timestamp_literal(at)
    )
}
