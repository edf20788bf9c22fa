//! SQLite dialect
//!
//! SQLite's ALTER TABLE only knows RENAME TO, RENAME COLUMN, ADD COLUMN and
//! DROP COLUMN. Everything needing a table rebuild is refused.

use super::{insert_values, push_constraints, Dialect, DialectError, DialectKind, TypeMap, TypeRule};
use crate::schema::{Column, ColumnChange, ForeignKey, PrimaryKey, Table, TypeKind};
use crate::script::Script;

static TYPES: TypeMap = TypeMap::new(
    "sqlite",
    &[
        TypeRule::plain(TypeKind::Integer, "INTEGER"),
        TypeRule::plain(TypeKind::BigInt, "INTEGER"),
        TypeRule::plain(TypeKind::SmallInt, "INTEGER"),
        TypeRule::length(TypeKind::Varchar, "VARCHAR", u32::MAX, None),
        TypeRule::length(TypeKind::Char, "CHAR", u32::MAX, None),
        TypeRule::plain(TypeKind::Text, "TEXT"),
        TypeRule::plain(TypeKind::Boolean, "BOOLEAN"),
        TypeRule::plain(TypeKind::Date, "DATE"),
        TypeRule::plain(TypeKind::Time, "TIME"),
        TypeRule::plain(TypeKind::Timestamp, "TIMESTAMP"),
        TypeRule::precision(TypeKind::Decimal, "NUMERIC", u8::MAX),
        TypeRule::plain(TypeKind::Float, "REAL"),
        TypeRule::plain(TypeKind::Double, "REAL"),
        TypeRule::plain(TypeKind::Blob, "BLOB"),
    ],
);

#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub fn new() -> Self {
        Self
    }

    /// The single auto-increment primary key column, which SQLite declares inline
    fn rowid_alias<'a>(&self, table: &'a Table) -> Result<Option<&'a Column>, DialectError> {
        let Some(column) = table.columns().iter().find(|c| c.auto_increment) else {
            return Ok(None);
        };
        let inline = table
            .primary_key()
            .is_some_and(|pk| pk.name.is_none() && pk.columns.len() == 1 && pk.columns[0] == column.name);
        if inline && table.columns().iter().filter(|c| c.auto_increment).count() == 1 {
            Ok(Some(column))
        } else {
            Err(DialectError::unsupported(
                "auto-increment outside a single-column primary key",
                self.name(),
            ))
        }
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn type_map(&self) -> &TypeMap {
        &TYPES
    }

    fn create_table(&self, table: &Table) -> Result<Script, DialectError> {
        let rowid = self.rowid_alias(table)?;
        let mut parts = Vec::with_capacity(table.columns().len() + 1);
        for column in table.columns() {
            if rowid.is_some_and(|r| r.name == column.name) {
                parts.push(format!(
                    "{} INTEGER PRIMARY KEY AUTOINCREMENT",
                    self.quote_ident(&column.name)
                ));
            } else {
                let mut sql = format!(
                    "{} {}",
                    self.quote_ident(&column.name),
                    self.column_type(&column.column_type)?
                );
                push_constraints(&mut sql, column);
                parts.push(sql);
            }
        }
        if let (None, Some(pk)) = (rowid, table.primary_key()) {
            parts.push(self.primary_key_clause(pk));
        }
        Ok(Script::single(format!(
            "CREATE TABLE {} ({})",
            self.quote_ident(table.name()),
            parts.join(", ")
        )))
    }

    fn modify_column(&self, _table: &str, _change: &ColumnChange, _merged: &Column) -> Result<Script, DialectError> {
        Err(DialectError::unsupported("modify column", self.name()))
    }

    fn add_foreign_key(&self, _table: &str, _fk: &ForeignKey) -> Result<Script, DialectError> {
        Err(DialectError::unsupported("add foreign key", self.name()))
    }

    fn drop_foreign_key(&self, _table: &str, _name: &str) -> Result<Script, DialectError> {
        Err(DialectError::unsupported("drop foreign key", self.name()))
    }

    fn add_primary_key(&self, _table: &str, _pk: &PrimaryKey) -> Result<Script, DialectError> {
        Err(DialectError::unsupported("add primary key", self.name()))
    }

    fn drop_primary_key(&self, _table: &str, _name: Option<&str>) -> Result<Script, DialectError> {
        Err(DialectError::unsupported("drop primary key", self.name()))
    }

    fn insert_ignore(&self, table: &str, columns: &[&str], values: &[String]) -> String {
        format!(
            "INSERT OR IGNORE {}",
            insert_values(|s| self.quote_ident(s), table, columns, values)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_create_table_inlines_autoincrement_key() {
        let mut table = Table::with_columns(
            "notes",
            [
                Column::new("id", ColumnType::BigInt).auto_increment(),
                Column::new("body", ColumnType::Text).not_null(),
            ],
        )
        .unwrap();
        table.set_primary_key(PrimaryKey::new(["id"])).unwrap();

        let script = SqliteDialect::new().create_table(&table).unwrap();
        assert_eq!(
            script.statements(),
            ["CREATE TABLE \"notes\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"body\" TEXT NOT NULL)"]
        );
    }

    #[test]
    fn test_auto_increment_without_primary_key_is_refused() {
        let table = Table::with_columns("notes", [Column::new("id", ColumnType::Integer).auto_increment()]).unwrap();
        assert!(matches!(
            SqliteDialect::new().create_table(&table),
            Err(DialectError::UnsupportedOperation { dialect: "sqlite", .. })
        ));

        let column = Column::new("seq", ColumnType::Integer).auto_increment();
        assert!(SqliteDialect::new().add_column("notes", &column).is_err());
    }

    #[test]
    fn test_unsupported_alterations() {
        let dialect = SqliteDialect::new();
        let column = Column::new("body", ColumnType::Text);
        assert_eq!(
            dialect.modify_column("notes", &ColumnChange::new("body").nullable(false), &column),
            Err(DialectError::UnsupportedOperation {
                operation: "modify column",
                dialect: "sqlite"
            })
        );
        assert!(dialect.add_primary_key("notes", &PrimaryKey::new(["id"])).is_err());
        assert!(dialect.drop_primary_key("notes", None).is_err());
    }

    #[test]
    fn test_type_mapping() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.column_type(&ColumnType::SmallInt).unwrap(), "INTEGER");
        assert_eq!(dialect.column_type(&ColumnType::Double).unwrap(), "REAL");
        assert_eq!(
            dialect.column_type(&ColumnType::Decimal { precision: 10, scale: 2 }).unwrap(),
            "NUMERIC(10,2)"
        );
        assert_eq!(
            dialect.insert_ignore("t", &["id"], &["1".to_string()]),
            "INSERT OR IGNORE INTO \"t\" (\"id\") VALUES (1)"
        );
    }
}
