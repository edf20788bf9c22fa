//! `SchemaExecutor` - the seam between the migration engine and a database
//!
//! The engine only needs to run statements one at a time, read a single
//! bookkeeping row, and bracket work in a transaction. Anything that can do
//! that (a driver connection, a pooled handle, the in-memory executor used in
//! tests) can drive a migration.

use std::fmt;

#[cfg(feature = "postgres")]
use may_postgres::{types::Type, Client, Error as PostgresError, Row};
#[cfg(feature = "postgres")]
use std::time::Instant;

/// A scalar read back from the bookkeeping table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// Executor error type
#[derive(Debug)]
pub enum ExecutorError {
    /// `PostgreSQL` error from `may_postgres`
    #[cfg(feature = "postgres")]
    PostgresError(PostgresError),
    /// Statement rejected by the database (driver message)
    QueryError(String),
    /// Row could not be converted
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            ExecutorError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            ExecutorError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            ExecutorError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            ExecutorError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "postgres")]
            ExecutorError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<PostgresError> for ExecutorError {
    fn from(err: PostgresError) -> Self {
        ExecutorError::PostgresError(err)
    }
}

/// Runs SQL on behalf of the migration engine
///
/// Statements are complete SQL text; the engine never binds parameters.
///
/// # Examples
///
/// ```no_run
/// use revolt::executor::{ExecutorError, SchemaExecutor};
///
/// fn version(executor: &dyn SchemaExecutor) -> Result<Option<i64>, ExecutorError> {
///     let row = executor.query_row("SELECT version FROM revolt_version WHERE id = 1")?;
///     Ok(row.and_then(|values| values.first().and_then(|v| v.as_i64())))
/// }
/// ```
pub trait SchemaExecutor {
    /// Execute a statement and return the number of rows affected (0 for DDL)
    fn execute(&self, sql: &str) -> Result<u64, ExecutorError>;

    /// Execute a query and return its first row, if any
    fn query_row(&self, sql: &str) -> Result<Option<Vec<SqlValue>>, ExecutorError>;

    fn begin(&self) -> Result<(), ExecutorError> {
        self.execute("BEGIN").map(|_| ())
    }

    fn commit(&self) -> Result<(), ExecutorError> {
        self.execute("COMMIT").map(|_| ())
    }

    fn rollback(&self) -> Result<(), ExecutorError> {
        self.execute("ROLLBACK").map(|_| ())
    }
}

/// `SchemaExecutor` over a `may_postgres::Client`
#[cfg(feature = "postgres")]
pub struct MayPostgresExecutor {
    client: Client,
}

#[cfg(feature = "postgres")]
impl MayPostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect and wrap the client
    pub fn connect(url: &str) -> Result<Self, crate::connection::ConnectionError> {
        crate::connection::connect(url).map(Self::new)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_client(self) -> Client {
        self.client
    }

    fn convert_row(row: &Row) -> Result<Vec<SqlValue>, ExecutorError> {
        let mut values = Vec::with_capacity(row.len());
        for (i, column) in row.columns().iter().enumerate() {
            let ty = column.type_();
            let value = if *ty == Type::INT8 {
                row.try_get::<_, Option<i64>>(i)?.map(SqlValue::Int)
            } else if *ty == Type::INT4 {
                row.try_get::<_, Option<i32>>(i)?.map(|v| SqlValue::Int(i64::from(v)))
            } else if *ty == Type::INT2 {
                row.try_get::<_, Option<i16>>(i)?.map(|v| SqlValue::Int(i64::from(v)))
            } else if *ty == Type::BOOL {
                row.try_get::<_, Option<bool>>(i)?.map(SqlValue::Bool)
            } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME {
                row.try_get::<_, Option<String>>(i)?.map(SqlValue::Text)
            } else {
                return Err(ExecutorError::ParseError(format!(
                    "unsupported column type {ty} for column '{}'",
                    column.name()
                )));
            };
            values.push(value.unwrap_or(SqlValue::Null));
        }
        Ok(values)
    }
}

#[cfg(feature = "postgres")]
impl SchemaExecutor for MayPostgresExecutor {
    fn execute(&self, sql: &str) -> Result<u64, ExecutorError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("revolt.execute", sql = %sql).entered();

        let start = Instant::now();
        let result = self.client.execute(sql, &[]).map_err(ExecutorError::PostgresError);
        log::debug!("executed in {:?}: {sql}", start.elapsed());
        result
    }

    fn query_row(&self, sql: &str) -> Result<Option<Vec<SqlValue>>, ExecutorError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("revolt.query", sql = %sql).entered();

        let rows = self.client.query(sql, &[])?;
        rows.first().map(Self::convert_row).transpose()
    }
}
