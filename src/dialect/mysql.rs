//! MySQL / MariaDB dialect

use super::{insert_values, push_constraints, Dialect, DialectError, DialectKind, TypeMap, TypeRule};
use crate::schema::{Column, ColumnChange, ColumnPosition, TypeKind};
use crate::script::Script;

static TYPES: TypeMap = TypeMap::new(
    "mysql",
    &[
        TypeRule::plain(TypeKind::Integer, "INT"),
        TypeRule::plain(TypeKind::BigInt, "BIGINT"),
        TypeRule::plain(TypeKind::SmallInt, "SMALLINT"),
        // utf8mb4 row size limit
        TypeRule::length(TypeKind::Varchar, "VARCHAR", 16_383, Some("LONGTEXT")),
        TypeRule::length(TypeKind::Char, "CHAR", 255, None),
        TypeRule::plain(TypeKind::Text, "LONGTEXT"),
        TypeRule::plain(TypeKind::Boolean, "TINYINT(1)"),
        TypeRule::plain(TypeKind::Date, "DATE"),
        TypeRule::plain(TypeKind::Time, "TIME"),
        TypeRule::plain(TypeKind::Timestamp, "DATETIME"),
        TypeRule::precision(TypeKind::Decimal, "DECIMAL", 65),
        TypeRule::plain(TypeKind::Float, "FLOAT"),
        TypeRule::plain(TypeKind::Double, "DOUBLE"),
        TypeRule::plain(TypeKind::Blob, "LONGBLOB"),
    ],
);

/// MySQL 8 / MariaDB 10.5+
///
/// DDL statements commit implicitly, so a failed refactoring may leave
/// earlier statements of the same script applied.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn type_map(&self) -> &TypeMap {
        &TYPES
    }

    fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn supports_transactional_ddl(&self) -> bool {
        false
    }

    fn column_definition(&self, column: &Column) -> Result<String, DialectError> {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type(&column.column_type)?
        );
        push_constraints(&mut sql, column);
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        Ok(sql)
    }

    fn rename_table(&self, table: &str, new_name: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "RENAME TABLE {} TO {}",
            self.quote_ident(table),
            self.quote_ident(new_name)
        )))
    }

    fn place_column(&self, table: &str, column: &Column, position: &ColumnPosition) -> Result<Script, DialectError> {
        let placement = match position {
            ColumnPosition::First => "FIRST".to_string(),
            ColumnPosition::After(prev) => format!("AFTER {}", self.quote_ident(prev)),
        };
        Ok(Script::single(format!(
            "ALTER TABLE {} ADD COLUMN {} {placement}",
            self.quote_ident(table),
            self.column_definition(column)?
        )))
    }

    /// MODIFY COLUMN restates the whole definition
    fn modify_column(&self, table: &str, _change: &ColumnChange, merged: &Column) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            self.quote_ident(table),
            self.column_definition(merged)?
        )))
    }

    fn drop_index(&self, table: &str, index: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "DROP INDEX {} ON {}",
            self.quote_ident(index),
            self.quote_ident(table)
        )))
    }

    fn drop_foreign_key(&self, table: &str, name: &str) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_ident(table),
            self.quote_ident(name)
        )))
    }

    fn drop_primary_key(&self, table: &str, _name: Option<&str>) -> Result<Script, DialectError> {
        Ok(Script::single(format!(
            "ALTER TABLE {} DROP PRIMARY KEY",
            self.quote_ident(table)
        )))
    }

    fn insert_ignore(&self, table: &str, columns: &[&str], values: &[String]) -> String {
        format!(
            "INSERT IGNORE {}",
            insert_values(|s| self.quote_ident(s), table, columns, values)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_type_mapping() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.column_type(&ColumnType::Boolean).unwrap(), "TINYINT(1)");
        assert_eq!(dialect.column_type(&ColumnType::Text).unwrap(), "LONGTEXT");
        assert_eq!(dialect.column_type(&ColumnType::Varchar(70_000)).unwrap(), "LONGTEXT");
        assert_eq!(dialect.column_type(&ColumnType::Timestamp).unwrap(), "DATETIME");
        assert!(dialect
            .column_type(&ColumnType::Decimal { precision: 70, scale: 2 })
            .is_err());
    }

    #[test]
    fn test_modify_column_restates_definition() {
        let change = ColumnChange::new("title").nullable(false);
        let mut merged = Column::new("title", ColumnType::Varchar(50)).default_value("'untitled'");
        merged.merge(&change);

        let script = MysqlDialect::new().modify_column("posts", &change, &merged).unwrap();
        assert_eq!(
            script.statements(),
            ["ALTER TABLE `posts` MODIFY COLUMN `title` VARCHAR(50) NOT NULL DEFAULT 'untitled'"]
        );
    }

    #[test]
    fn test_place_column() {
        let dialect = MysqlDialect::new();
        let column = Column::new("title", ColumnType::Varchar(200));
        assert_eq!(
            dialect
                .place_column("books", &column, &ColumnPosition::After("id".to_string()))
                .unwrap()
                .statements(),
            ["ALTER TABLE `books` ADD COLUMN `title` VARCHAR(200) AFTER `id`"]
        );
        assert_eq!(
            dialect
                .place_column("books", &column, &ColumnPosition::First)
                .unwrap()
                .statements(),
            ["ALTER TABLE `books` ADD COLUMN `title` VARCHAR(200) FIRST"]
        );
    }

    #[test]
    fn test_auto_increment_column() {
        let column = Column::new("id", ColumnType::Integer).auto_increment();
        assert_eq!(
            MysqlDialect::new().column_definition(&column).unwrap(),
            "`id` INT NOT NULL AUTO_INCREMENT"
        );
    }

    #[test]
    fn test_drop_statements() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.drop_index("users", "idx_email").unwrap().statements(),
            ["DROP INDEX `idx_email` ON `users`"]
        );
        assert_eq!(
            dialect.drop_foreign_key("orders", "fk_customer").unwrap().statements(),
            ["ALTER TABLE `orders` DROP FOREIGN KEY `fk_customer`"]
        );
        assert_eq!(
            dialect.drop_primary_key("users", Some("ignored")).unwrap().statements(),
            ["ALTER TABLE `users` DROP PRIMARY KEY"]
        );
        assert_eq!(
            dialect.rename_table("users", "accounts").unwrap().statements(),
            ["RENAME TABLE `users` TO `accounts`"]
        );
    }
}
