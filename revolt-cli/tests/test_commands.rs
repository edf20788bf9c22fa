//! Tests for the command handlers, run against the in-memory executor

use revolt::dialect::DialectKind;
use revolt::migration::Migrator;
use revolt::test_helpers::MemoryExecutor;
use revolt_cli::{commands, Changelog};
use std::path::Path;
use std::time::Duration;

fn migrator(kind: DialectKind) -> Migrator {
    let changelog = Changelog::load(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/changelog.toml"))
        .unwrap();
    Migrator::new(kind.dialect(), changelog.refactorings).with_lock_timeout(Duration::ZERO)
}

fn output(run: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> (anyhow::Result<()>, String) {
    colored::control::set_override(false);
    let mut buffer = Vec::new();
    let result = run(&mut buffer);
    (result, String::from_utf8(buffer).unwrap())
}

#[test]
fn test_status_lists_pending() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::new();

    let (result, out) = output(|out| commands::status(&migrator, &executor, out));

    result.unwrap();
    assert!(out.contains("Version: 0 of 6"));
    assert!(out.contains("⏳ 1. create table users"));
    assert!(out.contains("⏳ 6. custom SQL: seed admin user"));
    assert!(out.contains("0 applied, 6 pending"));
}

#[test]
fn test_up_dry_run_changes_nothing() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::new();

    let (result, out) = output(|out| commands::up(&migrator, &executor, Some(2), true, out));

    result.unwrap();
    assert!(out.contains("Would apply 2 refactoring(s)"));
    assert!(out.contains("CREATE TABLE \"users\" (\"id\" BIGSERIAL NOT NULL"));
    assert!(out.contains("-- add column users.created_at (version 2)"));
    assert!(!out.contains("idx_users_email"));
    assert!(executor.schema_statements().is_empty());
    assert!(!executor.has_version_table());
    assert_eq!(executor.version(), None);
}

#[test]
fn test_down_dry_run_on_fresh_database_writes_nothing() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::new();

    let (result, out) = output(|out| commands::down(&migrator, &executor, 1, true, out));

    result.unwrap();
    assert!(out.contains("No applied refactorings to revert"));
    assert!(!executor.has_version_table());
    assert!(executor.statements().iter().all(|s| s.starts_with("SELECT")));
}

#[test]
fn test_up_then_status_and_validate() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::new();

    let (result, out) = output(|out| commands::up(&migrator, &executor, None, false, out));
    result.unwrap();
    assert!(out.contains("Applied 6 refactoring(s), now at version 6"));
    assert_eq!(executor.version(), Some(6));
    assert!(executor
        .schema_statements()
        .iter()
        .any(|s| s.contains("ON DELETE CASCADE")));

    let (result, out) = output(|out| commands::status(&migrator, &executor, out));
    result.unwrap();
    assert!(out.contains("6 applied, 0 pending"));

    let (result, out) = output(|out| commands::validate(&migrator, &executor, out));
    result.unwrap();
    assert!(out.contains("Checksum valid at version 6"));

    let (result, out) = output(|out| commands::up(&migrator, &executor, None, false, out));
    result.unwrap();
    assert!(out.contains("up to date at version 6"));
}

#[test]
fn test_down_dry_run_and_revert() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::new();
    migrator.up(&executor, Some(5)).unwrap();

    let (result, out) = output(|out| commands::down(&migrator, &executor, 2, true, out));
    result.unwrap();
    assert!(out.contains("Would revert 2 refactoring(s)"));
    assert!(out.contains("DROP CONSTRAINT \"fk_orders_user\""));
    assert!(out.contains("DROP TABLE \"orders\""));
    assert_eq!(executor.version(), Some(5));

    let (result, out) = output(|out| commands::down(&migrator, &executor, 2, false, out));
    result.unwrap();
    assert!(out.contains("now at version 3"));
    assert_eq!(executor.version(), Some(3));
}

#[test]
fn test_down_refuses_custom_sql() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::new();
    migrator.up(&executor, None).unwrap();

    let (result, _) = output(|out| commands::down(&migrator, &executor, 1, false, out));

    assert!(result.unwrap_err().to_string().contains("cannot be reverted"));
    assert_eq!(executor.version(), Some(6));
}

#[test]
fn test_plan_renders_mysql_offline() {
    let migrator = migrator(DialectKind::Mysql);

    let (result, out) = output(|out| commands::plan(&migrator, 3, out));

    result.unwrap();
    assert!(out.contains("-- revolt plan for mysql: version 3 -> 6"));
    assert!(out.contains("CREATE TABLE `orders`"));
    assert!(out.contains("`total` DECIMAL(10,2)"));
    assert!(out.contains("INSERT INTO users (email) VALUES ('admin@example.com');"));
    assert!(!out.contains("CREATE TABLE `users`"));
}

#[test]
fn test_check_passes_for_postgres() {
    let migrator = migrator(DialectKind::Postgres);

    let (result, out) = output(|out| commands::check(&migrator, out));

    result.unwrap();
    assert!(out.contains("6 refactoring(s) valid for postgres (2 table(s) in the final schema)"));
}

#[test]
fn test_check_reports_unsupported_sqlite_operation() {
    let migrator = migrator(DialectKind::Sqlite);

    let (result, out) = output(|out| commands::check(&migrator, out));

    assert!(result.is_err());
    assert!(out.contains("✗"));
    assert!(out.contains("add foreign key fk_orders_user on orders"));
}

#[test]
fn test_validate_detects_edited_changelog() {
    let migrator = migrator(DialectKind::Postgres);
    let executor = MemoryExecutor::with_version(2, "not-the-checksum");

    let (result, _) = output(|out| commands::validate(&migrator, &executor, out));

    assert!(result.is_err());

    let (result, out) = output(|out| commands::status(&migrator, &executor, out));
    result.unwrap();
    assert!(out.contains("does not match the changelog"));
}
