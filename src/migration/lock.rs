//! Table-based migration lock
//!
//! The lock is a reserved row (`id = -1`) in the bookkeeping table. Whoever
//! manages to insert it holds the lock; everyone else polls until the row is
//! deleted or their timeout runs out.

use crate::dialect::Dialect;
use crate::executor::SchemaExecutor;
use crate::migration::{MigrationError, VERSION_TABLE};
use chrono::Utc;
use std::time::{Duration, Instant};

/// Reserved row id of the lock record
const LOCK_ROW_ID: i64 = -1;

/// Delay between two acquisition attempts
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default time to wait for the lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Lock guard that releases the lock when dropped
pub struct MigrationLockGuard<'a> {
    executor: &'a dyn SchemaExecutor,
}

impl<'a> MigrationLockGuard<'a> {
    /// Acquire the lock, waiting up to `timeout`
    ///
    /// The bookkeeping table must already exist.
    pub fn new(
        executor: &'a dyn SchemaExecutor,
        dialect: &dyn Dialect,
        timeout: Duration,
    ) -> Result<Self, MigrationError> {
        acquire_migration_lock(executor, dialect, timeout)?;
        Ok(Self { executor })
    }

    pub fn executor(&self) -> &'a dyn SchemaExecutor {
        self.executor
    }
}

impl Drop for MigrationLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = release_migration_lock(self.executor) {
            log::warn!(
                "Failed to release migration lock: {e}. \
                 Remove it manually with: DELETE FROM {VERSION_TABLE} WHERE id = {LOCK_ROW_ID}"
            );
        }
    }
}

/// Insert the lock row, polling every 100 ms until it succeeds or `timeout` passes
///
/// The first attempt is made before the timeout is checked, so a zero timeout
/// means "try once".
pub fn acquire_migration_lock(
    executor: &dyn SchemaExecutor,
    dialect: &dyn Dialect,
    timeout: Duration,
) -> Result<(), MigrationError> {
    let start = Instant::now();
    let sql = dialect.insert_ignore(
        VERSION_TABLE,
        &["id", "version", "checksum", "updated_at"],
        &[
            LOCK_ROW_ID.to_string(),
            LOCK_ROW_ID.to_string(),
            "'lock'".to_string(),
            dialect.timestamp_literal(Utc::now()),
        ],
    );

    loop {
        if executor.execute(&sql)? > 0 {
            log::debug!("Acquired migration lock after {:?}", start.elapsed());
            return Ok(());
        }

        if start.elapsed() >= timeout {
            return Err(MigrationError::LockTimeout(format!(
                "could not acquire the migration lock within {} second(s). \
                 Another process may be running migrations. If none is, remove the stale lock with: \
                 DELETE FROM {VERSION_TABLE} WHERE id = {LOCK_ROW_ID}",
                timeout.as_secs()
            )));
        }

        log::debug!("Migration lock is held by another process, retrying");
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Delete the lock row
pub fn release_migration_lock(executor: &dyn SchemaExecutor) -> Result<(), MigrationError> {
    let sql = format!("DELETE FROM {VERSION_TABLE} WHERE id = {LOCK_ROW_ID}");
    executor.execute(&sql)?;
    Ok(())
}

/// Whether some process currently holds the lock
pub fn is_migration_lock_held(executor: &dyn SchemaExecutor) -> Result<bool, MigrationError> {
    let sql = format!("SELECT COUNT(*) FROM {VERSION_TABLE} WHERE id = {LOCK_ROW_ID}");
    let count = executor
        .query_row(&sql)?
        .and_then(|row| row.first().and_then(|v| v.as_i64()))
        .unwrap_or(0);
    Ok(count > 0)
}
