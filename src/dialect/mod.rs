//! SQL dialects
//!
//! A [`Dialect`] turns abstract schema operations into statements for one
//! database engine. The trait carries portable defaults for every operation;
//! the concrete dialects override only what their engine does differently
//! and refuse what it cannot do with [`DialectError::UnsupportedOperation`].
//!
//! The dialect instance is chosen once (see [`DialectKind`]) and passed to the
//! migrator explicitly.

mod mysql;
mod postgres;
mod sqlite;
mod typemap;

pub use mysql::MysqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use typemap::{TypeFormat, TypeMap, TypeRule};

use crate::schema::{Column, ColumnChange, ColumnPosition, ColumnType, ForeignKey, Index, OnDelete, PrimaryKey, Table};
use crate::script::Script;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Key of the fallback entry in `CustomSql` statement maps
pub const DEFAULT_SQL_KEY: &str = "default";

/// Rendering errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialectError {
    #[error("{operation} is not supported by the {dialect} dialect")]
    UnsupportedOperation {
        operation: &'static str,
        dialect: &'static str,
    },

    #[error("column type {column_type} is not supported by the {dialect} dialect")]
    UnsupportedType {
        column_type: String,
        dialect: &'static str,
    },

    #[error("custom SQL has no statements for '{dialect}' and no 'default' entry")]
    MissingCustomSql { dialect: &'static str },

    #[error("no definition of column '{column}' in table '{table}' to render")]
    MissingColumnDefinition { table: String, column: String },

    #[error("unknown dialect '{0}'")]
    UnknownDialect(String),
}

impl DialectError {
    pub(crate) fn unsupported(operation: &'static str, dialect: &'static str) -> Self {
        DialectError::UnsupportedOperation { operation, dialect }
    }
}

/// The built-in dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    Postgres,
    Mysql,
    Sqlite,
}

impl DialectKind {
    pub fn name(&self) -> &'static str {
        match self {
            DialectKind::Postgres => "postgres",
            DialectKind::Mysql => "mysql",
            DialectKind::Sqlite => "sqlite",
        }
    }

    /// Infer the dialect from a connection URL scheme
    ///
    /// ```
    /// use revolt::dialect::DialectKind;
    ///
    /// let kind = DialectKind::from_url("postgresql://app@localhost/app").unwrap();
    /// assert_eq!(kind, DialectKind::Postgres);
    /// ```
    pub fn from_url(url: &str) -> Result<Self, DialectError> {
        let scheme = url
            .split_once(':')
            .map(|(scheme, _)| scheme)
            .ok_or_else(|| DialectError::UnknownDialect(url.to_string()))?;
        // jdbc-style and driver-suffixed schemes: "mysql+pymysql", "sqlite3"
        let scheme = scheme.split('+').next().unwrap_or(scheme);
        match scheme.to_ascii_lowercase().as_str() {
            "sqlite3" => Ok(DialectKind::Sqlite),
            other => other.parse(),
        }
    }

    /// Fresh dialect instance for this kind
    pub fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            DialectKind::Postgres => Box::new(PostgresDialect::new()),
            DialectKind::Mysql => Box::new(MysqlDialect::new()),
            DialectKind::Sqlite => Box::new(SqliteDialect::new()),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DialectKind {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "sqlite" => Ok(DialectKind::Sqlite),
            _ => Err(DialectError::UnknownDialect(s.to_string())),
        }
    }
}

/// SQL generation for one database engine
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short lowercase name, also the key looked up in `CustomSql` maps
    fn name(&self) -> &'static str;

    fn kind(&self) -> DialectKind;

    fn type_map(&self) -> &TypeMap;

    fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Whether DDL statements take part in transactions
    fn supports_transactional_ddl(&self) -> bool {
        true
    }

    fn column_type(&self, column_type: &ColumnType) -> Result<String, DialectError> {
        self.type_map().render(column_type)
    }

    /// `name TYPE [NOT NULL] [DEFAULT x]`
    fn column_definition(&self, column: &Column) -> Result<String, DialectError> {
        if column.auto_increment {
            return Err(DialectError::unsupported("auto-increment column", self.name()));
        }
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type(&column.column_type)?
        );
        push_constraints(&mut sql, column);
        Ok(sql)
    }

    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|name| self.quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_table(&self, table: &Table) -> Result<Script, DialectError> {
        let mut parts = table
            .columns()
            .iter()
            .map(|column| self.column_definition(column))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(pk) = table.primary_key() {
            parts.push(self.primary_key_clause(pk));
        }
        Ok(Script::single(format!(
            "CREATE TABLE {} ({})",
            self.quote_ident(table.name()),
            parts.join(", ")
        )))
    }

    fn drop_table(&self, table: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!("DROP TABLE {}", self.quote_ident(table))))
    }

    fn rename_table(&self, table: &str, new_name: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_ident(table),
            self.quote_ident(new_name)
        )))
    }

    fn add_column(&self, table: &str, column: &Column) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_ident(table),
            self.column_definition(column)?
        )))
    }

    /// Add a column somewhere other than the end of the table
    fn place_column(&self, table: &str, column: &Column, position: &ColumnPosition) -> Result<Script, DialectError> {
        let _ = (table, column, position);
        Err(DialectError::unsupported("column placement", self.name()))
    }

    fn drop_column(&self, table: &str, column: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_ident(table),
            self.quote_ident(column)
        )))
    }

    fn rename_column(&self, table: &str, column: &str, new_name: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            self.quote_ident(table),
            self.quote_ident(column),
            self.quote_ident(new_name)
        )))
    }

    /// Alter a column; `merged` is the full column after the change was applied
    fn modify_column(&self, table: &str, change: &ColumnChange, merged: &Column) -> Result<Script, DialectError> {
        let _ = (table, change, merged);
        Err(DialectError::unsupported("modify column", self.name()))
    }

    fn add_index(&self, table: &str, index: &Index) -> Result<Script, DialectError> {
        let unique = if index.unique { "UNIQUE " } else { "" };
        Ok(Script::single(format!(
            "CREATE {unique}INDEX {} ON {} ({})",
            self.quote_ident(&index.name),
            self.quote_ident(table),
            self.quote_list(&index.columns)
        )))
    }

    fn drop_index(&self, table: &str, index: &str) -> Result<Script, DialectError> {
        let _ = table;
        Ok(Script::single(format!("DROP INDEX {}", self.quote_ident(index))))
    }

    fn add_foreign_key(&self, table: &str, fk: &ForeignKey) -> Result<Script, DialectError> {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_ident(table),
            self.quote_ident(&fk.name),
            self.quote_list(&fk.columns),
            self.quote_ident(&fk.references),
            self.quote_list(&fk.referenced_columns)
        );
        if fk.on_delete != OnDelete::None {
            sql.push_str(&format!(" ON DELETE {}", fk.on_delete));
        }
        Ok(Script::single(sql))
    }

    fn drop_foreign_key(&self, table: &str, name: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_ident(table),
            self.quote_ident(name)
        )))
    }

    fn primary_key_clause(&self, pk: &PrimaryKey) -> String {
        let columns = self.quote_list(&pk.columns);
        match &pk.name {
            Some(name) => format!("CONSTRAINT {} PRIMARY KEY ({columns})", self.quote_ident(name)),
            None => format!("PRIMARY KEY ({columns})"),
        }
    }

    fn add_primary_key(&self, table: &str, pk: &PrimaryKey) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} ADD {}",
            self.quote_ident(table),
            self.primary_key_clause(pk)
        )))
    }

    fn drop_primary_key(&self, table: &str, name: Option<&str>) -> Result<Script, DialectError> {
        let name = name.ok_or_else(|| DialectError::unsupported("drop unnamed primary key", self.name()))?;
        Ok(Script::single(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_ident(table),
            self.quote_ident(name)
        )))
    }

    /// Pick the statements registered for this dialect, falling back to `default`
    fn custom_sql(&self, statements: &BTreeMap<String, Vec<String>>) -> Result<Script, DialectError> {
        let chosen = statements
            .get(self.name())
            .or_else(|| statements.get(DEFAULT_SQL_KEY))
            .ok_or(DialectError::MissingCustomSql { dialect: self.name() })?;
        let mut script = Script::new();
        for statement in chosen {
            script.push(statement.trim().trim_end_matches(';').to_string());
        }
        Ok(script)
    }

    /// Insert a row unless one with the same key exists
    fn insert_ignore(&self, table: &str, columns: &[&str], values: &[String]) -> String;

    fn timestamp_literal(&self, at: DateTime<Utc>) -> String {
        format!("'{}'", at.format("%Y-%m-%d %H:%M:%S"))
    }

    /// DDL creating the bookkeeping table when it does not exist
    fn create_version_table(&self, table: &'static str) -> String {
        crate::migration::state_table::create_table_sql(self.kind(), table)
    }
}

fn push_constraints(sql: &mut String, column: &Column) {
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
}

fn insert_values(quote: impl Fn(&str) -> String, table: &str, columns: &[&str], values: &[String]) -> String {
    format!(
        "INTO {} ({}) VALUES ({})",
        quote(table),
        columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
        values.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, OnDelete};

    fn dialects() -> Vec<Box<dyn Dialect>> {
        [DialectKind::Postgres, DialectKind::Mysql, DialectKind::Sqlite]
            .iter()
            .map(DialectKind::dialect)
            .collect()
    }

    #[test]
    fn test_parse_dialect_kind() {
        assert_eq!("PostgreSQL".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("pg".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("mariadb".parse::<DialectKind>().unwrap(), DialectKind::Mysql);
        assert_eq!("sqlite".parse::<DialectKind>().unwrap(), DialectKind::Sqlite);
        assert_eq!(
            "oracle".parse::<DialectKind>(),
            Err(DialectError::UnknownDialect("oracle".to_string()))
        );
    }

    #[test]
    fn test_dialect_from_url() {
        assert_eq!(DialectKind::from_url("postgres://u:p@h/db").unwrap(), DialectKind::Postgres);
        assert_eq!(DialectKind::from_url("mysql+pymysql://h/db").unwrap(), DialectKind::Mysql);
        assert_eq!(DialectKind::from_url("sqlite:///tmp/app.db").unwrap(), DialectKind::Sqlite);
        assert!(DialectKind::from_url("localhost").is_err());
    }

    #[test]
    fn test_foreign_key_cascade_differs_per_dialect() {
        let fk = ForeignKey::new("fk_orders_customer", ["customer_id"], "customers", ["id"])
            .on_delete(OnDelete::Cascade);

        let rendered: Vec<_> = dialects()
            .iter()
            .map(|dialect| dialect.add_foreign_key("orders", &fk).map(|s| s.to_string()))
            .collect();

        assert_eq!(
            rendered[0].as_deref().unwrap(),
            "ALTER TABLE \"orders\" ADD CONSTRAINT \"fk_orders_customer\" FOREIGN KEY (\"customer_id\") \
             REFERENCES \"customers\" (\"id\") ON DELETE CASCADE;\n"
        );
        assert_eq!(
            rendered[1].as_deref().unwrap(),
            "ALTER TABLE `orders` ADD CONSTRAINT `fk_orders_customer` FOREIGN KEY (`customer_id`) \
             REFERENCES `customers` (`id`) ON DELETE CASCADE;\n"
        );
        assert_eq!(
            rendered[2],
            Err(DialectError::UnsupportedOperation {
                operation: "add foreign key",
                dialect: "sqlite"
            })
        );
    }

    #[test]
    fn test_custom_sql_falls_back_to_default() {
        let mut statements = BTreeMap::new();
        statements.insert("mysql".to_string(), vec!["SET foo = 1;".to_string()]);
        statements.insert(DEFAULT_SQL_KEY.to_string(), vec!["SELECT 1".to_string()]);

        let mysql = MysqlDialect::new().custom_sql(&statements).unwrap();
        assert_eq!(mysql.statements(), ["SET foo = 1"]);
        let pg = PostgresDialect::new().custom_sql(&statements).unwrap();
        assert_eq!(pg.statements(), ["SELECT 1"]);

        statements.remove(DEFAULT_SQL_KEY);
        assert_eq!(
            SqliteDialect::new().custom_sql(&statements),
            Err(DialectError::MissingCustomSql { dialect: "sqlite" })
        );
    }

    #[test]
    fn test_add_index_and_column_render_everywhere() {
        let index = Index::new("idx_users_email", ["email"]).unique();
        let column = Column::new("email", ColumnType::Varchar(255)).not_null().default_value("''");
        for dialect in dialects() {
            let script = dialect.add_index("users", &index).unwrap();
            assert!(script.statements()[0].starts_with("CREATE UNIQUE INDEX"));
            let script = dialect.add_column("users", &column).unwrap();
            assert!(script.statements()[0].ends_with("VARCHAR(255) NOT NULL DEFAULT ''"));
        }
    }
}
