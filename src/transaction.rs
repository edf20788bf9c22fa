//! Transaction guard over a [`SchemaExecutor`]
//!
//! Each refactoring runs inside one `Transaction`. The guard rolls back when
//! dropped without an explicit `commit`, so an early `?` return cannot leave a
//! transaction open on the connection.

use crate::executor::{ExecutorError, SchemaExecutor, SqlValue};
use std::fmt;

/// Transaction error type
#[derive(Debug)]
pub enum TransactionError {
    /// The executor failed to run a statement or a transaction command
    Executor(ExecutorError),
    /// Transaction already committed or rolled back
    TransactionClosed,
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::Executor(e) => write!(f, "{e}"),
            TransactionError::TransactionClosed => {
                write!(f, "Transaction has already been committed or rolled back")
            }
        }
    }
}

impl std::error::Error for TransactionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransactionError::Executor(e) => Some(e),
            TransactionError::TransactionClosed => None,
        }
    }
}

impl From<ExecutorError> for TransactionError {
    fn from(err: ExecutorError) -> Self {
        TransactionError::Executor(err)
    }
}

impl From<TransactionError> for ExecutorError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Executor(e) => e,
            TransactionError::TransactionClosed => ExecutorError::Other("Transaction closed".to_string()),
        }
    }
}

/// An open transaction
///
/// ```no_run
/// # use revolt::executor::SchemaExecutor;
/// use revolt::transaction::Transaction;
///
/// # fn run(executor: &dyn SchemaExecutor) -> Result<(), revolt::transaction::TransactionError> {
/// let tx = Transaction::begin(executor)?;
/// tx.execute("ALTER TABLE users ADD COLUMN email TEXT")?;
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction<'a> {
    executor: &'a dyn SchemaExecutor,
    closed: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(executor: &'a dyn SchemaExecutor) -> Result<Self, TransactionError> {
        executor.begin()?;
        Ok(Self {
            executor,
            closed: false,
        })
    }

    fn check_open(&self) -> Result<(), TransactionError> {
        if self.closed {
            Err(TransactionError::TransactionClosed)
        } else {
            Ok(())
        }
    }

    pub fn execute(&self, sql: &str) -> Result<u64, TransactionError> {
        self.check_open()?;
        Ok(self.executor.execute(sql)?)
    }

    pub fn query_row(&self, sql: &str) -> Result<Option<Vec<SqlValue>>, TransactionError> {
        self.check_open()?;
        Ok(self.executor.query_row(sql)?)
    }

    pub fn commit(mut self) -> Result<(), TransactionError> {
        self.check_open()?;
        self.closed = true;
        self.executor.commit()?;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), TransactionError> {
        self.check_open()?;
        self.closed = true;
        self.executor.rollback()?;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.executor.rollback() {
                log::warn!("Failed to roll back abandoned transaction: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MemoryExecutor;

    #[test]
    fn test_commit() {
        let executor = MemoryExecutor::new();
        let tx = Transaction::begin(&executor).unwrap();
        tx.execute("CREATE TABLE a (id INTEGER)").unwrap();
        tx.commit().unwrap();

        assert_eq!(executor.commits(), 1);
        assert_eq!(executor.rollbacks(), 0);
        assert_eq!(executor.schema_statements(), ["CREATE TABLE a (id INTEGER)"]);
    }

    #[test]
    fn test_drop_rolls_back() {
        let executor = MemoryExecutor::new();
        {
            let tx = Transaction::begin(&executor).unwrap();
            tx.execute("CREATE TABLE a (id INTEGER)").unwrap();
        }
        assert_eq!(executor.rollbacks(), 1);
        assert!(executor.schema_statements().is_empty());
    }

    #[test]
    fn test_explicit_rollback() {
        let executor = MemoryExecutor::new();
        let tx = Transaction::begin(&executor).unwrap();
        tx.execute("DROP TABLE a").unwrap();
        tx.rollback().unwrap();

        assert_eq!(executor.rollbacks(), 1);
        assert_eq!(executor.commits(), 0);
    }
}
