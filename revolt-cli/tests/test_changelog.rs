//! Tests for changelog loading

use revolt::Refactoring;
use revolt_cli::changelog::ChangelogFormat;
use revolt_cli::{Changelog, ChangelogError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/changelog.toml")
}

#[test]
fn test_load_toml_fixture() {
    let changelog = Changelog::load(fixture()).unwrap();

    let kinds: Vec<_> = changelog.refactorings.iter().map(Refactoring::kind).collect();
    assert_eq!(
        kinds,
        [
            "create-table",
            "add-column",
            "add-index",
            "create-table",
            "add-foreign-key",
            "custom-sql",
        ]
    );
    assert_eq!(changelog.refactorings[5].description(), "custom SQL: seed admin user");
}

#[test]
fn test_load_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("changelog.json");
    fs::write(
        &path,
        r#"{
            "refactoring": [
                {"type": "create-table", "table": "tags", "columns": [{"name": "label", "type": "TEXT"}]},
                {"type": "rename-table", "table": "tags", "new_name": "labels"}
            ]
        }"#,
    )
    .unwrap();

    let changelog = Changelog::load(&path).unwrap();

    assert_eq!(changelog.len(), 2);
    assert_eq!(
        changelog.refactorings[1],
        Refactoring::RenameTable {
            table: "tags".to_string(),
            new_name: "labels".to_string(),
        }
    );
}

#[test]
fn test_empty_toml_is_an_empty_changelog() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();

    assert!(Changelog::load(&path).unwrap().is_empty());
}

#[test]
fn test_unknown_refactoring_type() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[[refactoring]]\ntype = \"truncate-table\"\ntable = \"users\"\n").unwrap();

    assert!(matches!(Changelog::load(&path), Err(ChangelogError::Toml { .. })));
}

#[test]
fn test_invalid_column_type() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{"refactoring": [{"type": "add-column", "table": "t", "column": {"name": "c", "type": "VARCHAR(x)"}}]}"#,
    )
    .unwrap();

    assert!(matches!(Changelog::load(&path), Err(ChangelogError::Json { .. })));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("changelog.yaml");
    fs::write(&path, "refactoring: []").unwrap();

    let err = Changelog::load(&path).unwrap_err();
    assert!(matches!(err, ChangelogError::UnsupportedFormat(_)));
    assert!(err.to_string().contains("expected .toml or .json"));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Changelog::load(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ChangelogError::Io { .. }));
}

#[test]
fn test_format_from_path() {
    assert_eq!(ChangelogFormat::from_path(Path::new("a.TOML")), Some(ChangelogFormat::Toml));
    assert_eq!(ChangelogFormat::from_path(Path::new("dir/a.json")), Some(ChangelogFormat::Json));
    assert_eq!(ChangelogFormat::from_path(Path::new("Makefile")), None);
}
