//! PostgreSQL dialect

use super::{insert_values, push_constraints, Dialect, DialectError, DialectKind, TypeMap, TypeRule};
use crate::schema::{Column, ColumnChange, ColumnType, TypeKind};
use crate::script::Script;

static TYPES: TypeMap = TypeMap::new(
    "postgres",
    &[
        TypeRule::plain(TypeKind::Integer, "INTEGER"),
        TypeRule::plain(TypeKind::BigInt, "BIGINT"),
        TypeRule::plain(TypeKind::SmallInt, "SMALLINT"),
        TypeRule::length(TypeKind::Varchar, "VARCHAR", 10_485_760, Some("TEXT")),
        TypeRule::length(TypeKind::Char, "CHAR", 10_485_760, None),
        TypeRule::plain(TypeKind::Text, "TEXT"),
        TypeRule::plain(TypeKind::Boolean, "BOOLEAN"),
        TypeRule::plain(TypeKind::Date, "DATE"),
        TypeRule::plain(TypeKind::Time, "TIME"),
        TypeRule::plain(TypeKind::Timestamp, "TIMESTAMP"),
        TypeRule::precision(TypeKind::Decimal, "NUMERIC", 255),
        TypeRule::plain(TypeKind::Float, "REAL"),
        TypeRule::plain(TypeKind::Double, "DOUBLE PRECISION"),
        TypeRule::plain(TypeKind::Blob, "BYTEA"),
    ],
);

/// PostgreSQL 10+ with transactional DDL
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }

    fn serial_type(&self, column_type: &ColumnType) -> Result<&'static str, DialectError> {
        match column_type {
            ColumnType::SmallInt => Ok("SMALLSERIAL"),
            ColumnType::Integer => Ok("SERIAL"),
            ColumnType::BigInt => Ok("BIGSERIAL"),
            other => Err(DialectError::UnsupportedType {
                column_type: format!("{other} auto-increment"),
                dialect: self.name(),
            }),
        }
    }

    fn alter_column(&self, table: &str, column: &str, action: &str) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {} {action}",
            self.quote_ident(table),
            self.quote_ident(column)
        )
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn type_map(&self) -> &TypeMap {
        &TYPES
    }

    fn column_definition(&self, column: &Column) -> Result<String, DialectError> {
        if !column.auto_increment {
            let mut sql = format!(
                "{} {}",
                self.quote_ident(&column.name),
                self.column_type(&column.column_type)?
            );
            push_constraints(&mut sql, column);
            return Ok(sql);
        }
        // serial types carry their own sequence default
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.serial_type(&column.column_type)?
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }

    /// One `ALTER COLUMN` per changed attribute
    fn modify_column(&self, table: &str, change: &ColumnChange, merged: &Column) -> Result<Script, DialectError> {
        if change.auto_increment.is_some() {
            return Err(DialectError::unsupported("changing auto-increment", self.name()));
        }
        let mut script = Script::new();
        if let Some(column_type) = &change.column_type {
            let type_name = self.column_type(column_type)?;
            script.push(self.alter_column(table, &merged.name, &format!("TYPE {type_name}")));
        }
        match change.nullable {
            Some(false) => script.push(self.alter_column(table, &merged.name, "SET NOT NULL")),
            Some(true) => script.push(self.alter_column(table, &merged.name, "DROP NOT NULL")),
            None => {}
        }
        if change.drop_default {
            script.push(self.alter_column(table, &merged.name, "DROP DEFAULT"));
        } else if let Some(default) = &change.default {
            script.push(self.alter_column(table, &merged.name, &format!("SET DEFAULT {default}")));
        }
        Ok(script)
    }

    /// Unnamed keys get `<table>_pkey` from the table they were created on;
    /// the model refuses an unnamed drop once that table has been renamed
    fn drop_primary_key(&self, table: &str, name: Option<&str>) -> Result<Script, DialectError> {
        let name = name.map_or_else(|| format!("{table}_pkey"), str::to_string);
        Ok(Script::single(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_ident(table),
            self.quote_ident(&name)
        )))
    }

    fn insert_ignore(&self, table: &str, columns: &[&str], values: &[String]) -> String {
        format!(
            "INSERT {} ON CONFLICT DO NOTHING",
            insert_values(|s| self.quote_ident(s), table, columns, values)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PrimaryKey, Table};

    #[test]
    fn test_type_mapping() {
        let dialect = PostgresDialect::new();
        let cases = [
            (ColumnType::Decimal { precision: 10, scale: 2 }, "NUMERIC(10,2)"),
            (ColumnType::Double, "DOUBLE PRECISION"),
            (ColumnType::Blob, "BYTEA"),
            (ColumnType::Timestamp, "TIMESTAMP"),
            (ColumnType::Varchar(20_000_000), "TEXT"),
        ];
        for (ty, expected) in cases {
            assert_eq!(dialect.column_type(&ty).unwrap(), expected);
        }
    }

    #[test]
    fn test_create_table_with_serial_key() {
        let mut table = Table::with_columns(
            "users",
            [
                Column::new("id", ColumnType::BigInt).auto_increment(),
                Column::new("email", ColumnType::Varchar(255)).not_null(),
            ],
        )
        .unwrap();
        table.set_primary_key(PrimaryKey::new(["id"])).unwrap();

        let script = PostgresDialect::new().create_table(&table).unwrap();
        assert_eq!(
            script.statements(),
            ["CREATE TABLE \"users\" (\"id\" BIGSERIAL NOT NULL, \"email\" VARCHAR(255) NOT NULL, PRIMARY KEY (\"id\"))"]
        );
    }

    #[test]
    fn test_modify_column_emits_one_statement_per_attribute() {
        let change = ColumnChange::new("price")
            .column_type(ColumnType::Decimal { precision: 12, scale: 2 })
            .nullable(false)
            .drop_default();
        let mut merged = Column::new("price", ColumnType::Integer).default_value("0");
        merged.merge(&change);

        let script = PostgresDialect::new().modify_column("items", &change, &merged).unwrap();
        assert_eq!(
            script.statements(),
            [
                "ALTER TABLE \"items\" ALTER COLUMN \"price\" TYPE NUMERIC(12,2)",
                "ALTER TABLE \"items\" ALTER COLUMN \"price\" SET NOT NULL",
                "ALTER TABLE \"items\" ALTER COLUMN \"price\" DROP DEFAULT",
            ]
        );
    }

    #[test]
    fn test_drop_unnamed_primary_key_uses_default_name() {
        let script = PostgresDialect::new().drop_primary_key("users", None).unwrap();
        assert_eq!(script.statements(), ["ALTER TABLE \"users\" DROP CONSTRAINT \"users_pkey\""]);
    }

    #[test]
    fn test_insert_ignore() {
        let sql = PostgresDialect::new().insert_ignore("revolt_version", &["id", "version"], &["1".into(), "0".into()]);
        assert_eq!(
            sql,
            "INSERT INTO \"revolt_version\" (\"id\", \"version\") VALUES (1, 0) ON CONFLICT DO NOTHING"
        );
    }
}
