//! Test support: an in-memory [`SchemaExecutor`]
//!
//! `MemoryExecutor` understands just enough SQL to play the bookkeeping
//! table (version row and lock row) and records every other statement as an
//! applied schema change. Transactions are simulated with snapshots so a
//! rollback discards the schema statements and version updates made since
//! `BEGIN`. The lock row lives outside transactions, as it does on a real
//! connection in autocommit mode.
//!
//! Available to downstream tests through the `test-helpers` feature.

use crate::executor::{ExecutorError, SchemaExecutor, SqlValue};
use crate::migration::VERSION_TABLE;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;

static VERSION_UPDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"version = (\d+), checksum = '([^']*)'").expect("version update pattern is valid")
});

#[derive(Debug, Clone, Default)]
struct Snapshot {
    applied: usize,
    version_table: bool,
    version: Option<(i64, String)>,
}

#[derive(Debug, Default)]
struct State {
    applied: Vec<String>,
    log: Vec<String>,
    version_table: bool,
    version: Option<(i64, String)>,
    lock_held: bool,
    lock_attempts: usize,
    transaction: Option<Snapshot>,
    fail_on: Vec<String>,
    commits: usize,
    rollbacks: usize,
}

impl State {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            applied: self.applied.len(),
            version_table: self.version_table,
            version: self.version.clone(),
        }
    }
}

/// In-memory executor for engine tests
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    state: RefCell<State>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing bookkeeping table at `version`
    pub fn with_version(version: i64, checksum: impl Into<String>) -> Self {
        let executor = Self::new();
        {
            let mut state = executor.state.borrow_mut();
            state.version_table = true;
            state.version = Some((version, checksum.into()));
        }
        executor
    }

    /// Fail every statement containing `pattern`
    pub fn fail_on(&self, pattern: impl Into<String>) {
        self.state.borrow_mut().fail_on.push(pattern.into());
    }

    pub fn clear_failures(&self) {
        self.state.borrow_mut().fail_on.clear();
    }

    /// Simulate another process holding (or releasing) the migration lock
    pub fn set_lock_held(&self, held: bool) {
        self.state.borrow_mut().lock_held = held;
    }

    pub fn lock_held(&self) -> bool {
        self.state.borrow().lock_held
    }

    pub fn lock_attempts(&self) -> usize {
        self.state.borrow().lock_attempts
    }

    pub fn has_version_table(&self) -> bool {
        self.state.borrow().version_table
    }

    /// Stored marker, `None` when no version row exists
    pub fn version(&self) -> Option<i64> {
        self.state.borrow().version.as_ref().map(|(v, _)| *v)
    }

    pub fn checksum(&self) -> Option<String> {
        self.state.borrow().version.as_ref().map(|(_, c)| c.clone())
    }

    /// Every statement received, in order, including bookkeeping and transaction control
    pub fn statements(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }

    /// Schema statements that are currently applied (committed or in the open transaction)
    pub fn schema_statements(&self) -> Vec<String> {
        self.state.borrow().applied.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.borrow().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state.borrow().rollbacks
    }

    fn check_failure(state: &State, sql: &str) -> Result<(), ExecutorError> {
        match state.fail_on.iter().find(|pattern| sql.contains(pattern.as_str())) {
            Some(pattern) => Err(ExecutorError::QueryError(format!(
                "simulated failure on '{pattern}'"
            ))),
            None => Ok(()),
        }
    }

    fn missing_table() -> ExecutorError {
        ExecutorError::QueryError(format!("relation \"{VERSION_TABLE}\" does not exist"))
    }

    fn bookkeeping(state: &mut State, sql: &str) -> Result<u64, ExecutorError> {
        let upper = sql.trim_start().to_ascii_uppercase();
        if upper.starts_with("CREATE TABLE") {
            state.version_table = true;
            return Ok(0);
        }
        if !state.version_table {
            return Err(Self::missing_table());
        }
        if upper.starts_with("INSERT") {
            if sql.contains("VALUES (-1,") {
                state.lock_attempts += 1;
                if state.lock_held {
                    return Ok(0);
                }
                state.lock_held = true;
                return Ok(1);
            }
            if state.version.is_some() {
                return Ok(0);
            }
            state.version = Some((0, String::new()));
            return Ok(1);
        }
        if upper.starts_with("UPDATE") {
            let caps = VERSION_UPDATE
                .captures(sql)
                .ok_or_else(|| ExecutorError::QueryError(format!("unexpected update: {sql}")))?;
            let version = caps[1]
                .parse()
                .map_err(|e| ExecutorError::ParseError(format!("{e}")))?;
            let updated = u64::from(state.version.is_some());
            if updated == 1 {
                state.version = Some((version, caps[2].to_string()));
            }
            return Ok(updated);
        }
        if upper.starts_with("DELETE") {
            let released = u64::from(state.lock_held);
            state.lock_held = false;
            return Ok(released);
        }
        Err(ExecutorError::QueryError(format!("unexpected bookkeeping statement: {sql}")))
    }
}

impl SchemaExecutor for MemoryExecutor {
    fn execute(&self, sql: &str) -> Result<u64, ExecutorError> {
        let mut state = self.state.borrow_mut();
        state.log.push(sql.to_string());
        Self::check_failure(&state, sql)?;
        if sql.contains(VERSION_TABLE) {
            return Self::bookkeeping(&mut state, sql);
        }
        state.applied.push(sql.to_string());
        Ok(0)
    }

    fn query_row(&self, sql: &str) -> Result<Option<Vec<SqlValue>>, ExecutorError> {
        let mut state = self.state.borrow_mut();
        state.log.push(sql.to_string());
        Self::check_failure(&state, sql)?;
        if sql.contains("information_schema.tables") || sql.contains("sqlite_master") {
            return Ok(Some(vec![SqlValue::Int(i64::from(state.version_table))]));
        }
        if !state.version_table {
            return Err(Self::missing_table());
        }
        if sql.contains("COUNT(*)") {
            return Ok(Some(vec![SqlValue::Int(i64::from(state.lock_held))]));
        }
        Ok(state
            .version
            .as_ref()
            .map(|(version, checksum)| vec![SqlValue::Int(*version), SqlValue::Text(checksum.clone())]))
    }

    fn begin(&self) -> Result<(), ExecutorError> {
        let mut state = self.state.borrow_mut();
        state.log.push("BEGIN".to_string());
        if state.transaction.is_some() {
            return Err(ExecutorError::Other("transaction already open".to_string()));
        }
        state.transaction = Some(state.snapshot());
        Ok(())
    }

    fn commit(&self) -> Result<(), ExecutorError> {
        let mut state = self.state.borrow_mut();
        state.log.push("COMMIT".to_string());
        Self::check_failure(&state, "COMMIT")?;
        state
            .transaction
            .take()
            .ok_or_else(|| ExecutorError::Other("no transaction open".to_string()))?;
        state.commits += 1;
        Ok(())
    }

    fn rollback(&self) -> Result<(), ExecutorError> {
        let mut state = self.state.borrow_mut();
        state.log.push("ROLLBACK".to_string());
        let snapshot = state
            .transaction
            .take()
            .ok_or_else(|| ExecutorError::Other("no transaction open".to_string()))?;
        state.applied.truncate(snapshot.applied);
        state.version_table = snapshot.version_table;
        state.version = snapshot.version;
        state.rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_row_is_exclusive() {
        let executor = MemoryExecutor::with_version(0, "");
        let lock = "INSERT INTO revolt_version (id, version, checksum) VALUES (-1, -1, 'lock')";
        assert_eq!(executor.execute(lock).unwrap(), 1);
        assert_eq!(executor.execute(lock).unwrap(), 0);
        executor.execute("DELETE FROM revolt_version WHERE id = -1").unwrap();
        assert!(!executor.lock_held());
        assert_eq!(executor.lock_attempts(), 2);
    }

    #[test]
    fn test_rollback_restores_version_and_schema() {
        let executor = MemoryExecutor::with_version(1, "abc");
        executor.begin().unwrap();
        executor.execute("CREATE TABLE t (id INTEGER)").unwrap();
        executor
            .execute("UPDATE revolt_version SET version = 2, checksum = 'def' WHERE id = 1")
            .unwrap();
        assert_eq!(executor.version(), Some(2));
        executor.rollback().unwrap();

        assert_eq!(executor.version(), Some(1));
        assert_eq!(executor.checksum().as_deref(), Some("abc"));
        assert!(executor.schema_statements().is_empty());
    }

    #[test]
    fn test_missing_table_and_failures() {
        let executor = MemoryExecutor::new();
        assert!(executor.query_row("SELECT version, checksum FROM revolt_version WHERE id = 1").is_err());

        executor.fail_on("users");
        assert!(executor.execute("DROP TABLE users").is_err());
        executor.clear_failures();
        assert!(executor.execute("DROP TABLE users").is_ok());
    }
}
