//! Declarative schema refactorings
//!
//! A [`Refactoring`] is one immutable schema change. It knows how to apply
//! itself to the in-memory [`Database`] model and how to render itself as a
//! [`Script`] through a [`Dialect`]. Refactorings are serde-tagged by `type`
//! so a changelog file can declare them directly:
//!
//! ```toml
//! [[refactoring]]
//! type = "add-column"
//! table = "users"
//! column = { name = "email", type = "VARCHAR(255)", nullable = false }
//! ```

mod reverse;

use crate::dialect::{Dialect, DialectError};
use crate::schema::{Column, ColumnChange, ColumnPosition, Database, ForeignKey, Index, PrimaryKey, SchemaError, Table};
use crate::script::Script;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Refactoring {
    CreateTable {
        table: String,
        columns: Vec<Column>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        primary_key: Option<PrimaryKey>,
    },
    DropTable {
        table: String,
    },
    RenameTable {
        table: String,
        new_name: String,
    },
    AddColumn {
        table: String,
        column: Column,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<ColumnPosition>,
    },
    DropColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        column: String,
        new_name: String,
    },
    ModifyColumn {
        table: String,
        column: ColumnChange,
    },
    AddIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        table: String,
        index: String,
    },
    AddForeignKey {
        table: String,
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        table: String,
        foreign_key: String,
    },
    AddPrimaryKey {
        table: String,
        primary_key: PrimaryKey,
    },
    DropPrimaryKey {
        table: String,
        /// Constraint name, where the engine needs one to drop the key
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Literal SQL per dialect name, with `default` as fallback
    CustomSql {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        statements: BTreeMap<String, Vec<String>>,
    },
}

impl Refactoring {
    /// The serde tag of this variant
    pub fn kind(&self) -> &'static str {
        match self {
            Refactoring::CreateTable { .. } => "create-table",
            Refactoring::DropTable { .. } => "drop-table",
            Refactoring::RenameTable { .. } => "rename-table",
            Refactoring::AddColumn { .. } => "add-column",
            Refactoring::DropColumn { .. } => "drop-column",
            Refactoring::RenameColumn { .. } => "rename-column",
            Refactoring::ModifyColumn { .. } => "modify-column",
            Refactoring::AddIndex { .. } => "add-index",
            Refactoring::DropIndex { .. } => "drop-index",
            Refactoring::AddForeignKey { .. } => "add-foreign-key",
            Refactoring::DropForeignKey { .. } => "drop-foreign-key",
            Refactoring::AddPrimaryKey { .. } => "add-primary-key",
            Refactoring::DropPrimaryKey { .. } => "drop-primary-key",
            Refactoring::CustomSql { .. } => "custom-sql",
        }
    }

    /// One-line summary used in logs, reports and errors
    pub fn description(&self) -> String {
        match self {
            Refactoring::CreateTable { table, .. } => format!("create table {table}"),
            Refactoring::DropTable { table } => format!("drop table {table}"),
            Refactoring::RenameTable { table, new_name } => format!("rename table {table} to {new_name}"),
            Refactoring::AddColumn { table, column, .. } => format!("add column {table}.{}", column.name),
            Refactoring::DropColumn { table, column } => format!("drop column {table}.{column}"),
            Refactoring::RenameColumn { table, column, new_name } => {
                format!("rename column {table}.{column} to {new_name}")
            }
            Refactoring::ModifyColumn { table, column } => format!("modify column {table}.{}", column.name),
            Refactoring::AddIndex { table, index } => format!("add index {} on {table}", index.name),
            Refactoring::DropIndex { table, index } => format!("drop index {index} on {table}"),
            Refactoring::AddForeignKey { table, foreign_key } => {
                format!("add foreign key {} on {table}", foreign_key.name)
            }
            Refactoring::DropForeignKey { table, foreign_key } => {
                format!("drop foreign key {foreign_key} on {table}")
            }
            Refactoring::AddPrimaryKey { table, .. } => format!("add primary key on {table}"),
            Refactoring::DropPrimaryKey { table, .. } => format!("drop primary key on {table}"),
            Refactoring::CustomSql { description, .. } => description
                .as_deref()
                .map_or_else(|| "custom SQL".to_string(), |d| format!("custom SQL: {d}")),
        }
    }

    /// Apply this change to the model
    ///
    /// Fails without touching the model when a name is unknown or clashes.
    pub fn alter_model(&self, model: &mut Database) -> Result<(), SchemaError> {
        match self {
            Refactoring::CreateTable {
                table,
                columns,
                primary_key,
            } => {
                let mut created = Table::with_columns(table.clone(), columns.iter().cloned())?;
                if let Some(pk) = primary_key {
                    created.set_primary_key(pk.clone())?;
                }
                model.add_table(created)
            }
            Refactoring::DropTable { table } => model.drop_table(table).map(drop),
            Refactoring::RenameTable { table, new_name } => model.rename_table(table, new_name),
            Refactoring::AddColumn {
                table,
                column,
                position,
            } => model
                .table_mut(table)?
                .insert_column(column.clone(), position.as_ref()),
            Refactoring::DropColumn { table, column } => model.drop_column(table, column),
            Refactoring::RenameColumn {
                table,
                column,
                new_name,
            } => model.rename_column(table, column, new_name),
            Refactoring::ModifyColumn { table, column } => model.table_mut(table)?.modify_column(column),
            Refactoring::AddIndex { table, index } => model.table_mut(table)?.add_index(index.clone()),
            Refactoring::DropIndex { table, index } => model.table_mut(table)?.drop_index(index).map(drop),
            Refactoring::AddForeignKey { table, foreign_key } => {
                model.add_foreign_key(table, foreign_key.clone())
            }
            Refactoring::DropForeignKey { table, foreign_key } => {
                model.table_mut(table)?.drop_foreign_key(foreign_key).map(drop)
            }
            Refactoring::AddPrimaryKey { table, primary_key } => {
                model.table_mut(table)?.set_primary_key(primary_key.clone())
            }
            Refactoring::DropPrimaryKey { table, name } => {
                let owner = model.table_mut(table)?;
                if let Some(origin) = owner.renamed_key_origin().filter(|_| name.is_none()) {
                    return Err(SchemaError::InvalidDefinition(format!(
                        "primary key of table '{table}' was created on '{origin}'; name the constraint to drop it"
                    )));
                }
                owner.drop_primary_key().map(drop)
            }
            Refactoring::CustomSql { .. } => Ok(()),
        }
    }

    /// Render the SQL for this change
    ///
    /// `model` is the schema *after* [`alter_model`](Self::alter_model) ran, which
    /// lets dialects that restate whole column definitions see the merged column.
    pub fn script(&self, dialect: &dyn Dialect, model: &Database) -> Result<Script, DialectError> {
        let script = match self {
            Refactoring::CreateTable {
                table,
                columns,
                primary_key,
            } => dialect.create_table(&Table::unchecked(table, columns, primary_key.as_ref()))?,
            Refactoring::DropTable { table } => dialect.drop_table(table)?,
            Refactoring::RenameTable { table, new_name } => dialect.rename_table(table, new_name)?,
            Refactoring::AddColumn {
                table,
                column,
                position: Some(position),
            } if !is_last_column(model, table, &column.name) => dialect.place_column(table, column, position)?,
            Refactoring::AddColumn { table, column, .. } => dialect.add_column(table, column)?,
            Refactoring::DropColumn { table, column } => dialect.drop_column(table, column)?,
            Refactoring::RenameColumn {
                table,
                column,
                new_name,
            } => dialect.rename_column(table, column, new_name)?,
            Refactoring::ModifyColumn { table, column } => {
                let merged = model
                    .table(table)
                    .and_then(|t| t.column(&column.name))
                    .map_err(|_| DialectError::MissingColumnDefinition {
                        table: table.clone(),
                        column: column.name.clone(),
                    })?;
                dialect.modify_column(table, column, merged)?
            }
            Refactoring::AddIndex { table, index } => dialect.add_index(table, index)?,
            Refactoring::DropIndex { table, index } => dialect.drop_index(table, index)?,
            Refactoring::AddForeignKey { table, foreign_key } => dialect.add_foreign_key(table, foreign_key)?,
            Refactoring::DropForeignKey { table, foreign_key } => dialect.drop_foreign_key(table, foreign_key)?,
            Refactoring::AddPrimaryKey { table, primary_key } => dialect.add_primary_key(table, primary_key)?,
            Refactoring::DropPrimaryKey { table, name } => dialect.drop_primary_key(table, name.as_deref())?,
            Refactoring::CustomSql { statements, .. } => dialect.custom_sql(statements)?,
        };
        Ok(script.described(self.description()))
    }
}

/// Whether `column` ends up at the end of `table`, where every engine can put it
fn is_last_column(model: &Database, table: &str, column: &str) -> bool {
    model
        .table(table)
        .ok()
        .and_then(|t| t.columns().last())
        .is_some_and(|last| last.name == column)
}

impl fmt::Display for Refactoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MysqlDialect, PostgresDialect};
    use crate::schema::{ColumnType, ObjectKind};

    fn create_users() -> Refactoring {
        Refactoring::CreateTable {
            table: "users".to_string(),
            columns: vec![
                Column::new("id", ColumnType::Integer).auto_increment(),
                Column::new("title", ColumnType::Varchar(50)),
            ],
            primary_key: Some(PrimaryKey::new(["id"])),
        }
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml = r#"
            type = "add-column"
            table = "users"
            column = { name = "email", type = "VARCHAR(255)", nullable = false }
        "#;
        let refactoring: Refactoring = toml::from_str(toml).unwrap();
        assert_eq!(
            refactoring,
            Refactoring::AddColumn {
                table: "users".to_string(),
                column: Column::new("email", ColumnType::Varchar(255)).not_null(),
                position: None,
            }
        );
        assert_eq!(refactoring.kind(), "add-column");
        assert_eq!(refactoring.description(), "add column users.email");
    }

    #[test]
    fn test_add_column_position() {
        let toml = r#"
            type = "add-column"
            table = "users"
            column = { name = "slug", type = "TEXT" }
            position = { after = "id" }
        "#;
        let add: Refactoring = toml::from_str(toml).unwrap();
        assert!(matches!(
            &add,
            Refactoring::AddColumn { position: Some(ColumnPosition::After(prev)), .. } if prev == "id"
        ));

        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        add.alter_model(&mut model).unwrap();
        let names: Vec<_> = model
            .table("users")
            .unwrap()
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["id", "slug", "title"]);

        assert_eq!(
            add.script(&MysqlDialect::new(), &model).unwrap().statements(),
            ["ALTER TABLE `users` ADD COLUMN `slug` LONGTEXT AFTER `id`"]
        );
        assert_eq!(
            add.script(&PostgresDialect::new(), &model),
            Err(DialectError::UnsupportedOperation {
                operation: "column placement",
                dialect: "postgres"
            })
        );
    }

    #[test]
    fn test_trailing_position_renders_as_plain_add() {
        let add = Refactoring::AddColumn {
            table: "users".to_string(),
            column: Column::new("slug", ColumnType::Text),
            position: Some(ColumnPosition::After("title".to_string())),
        };
        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        add.alter_model(&mut model).unwrap();

        assert_eq!(
            add.script(&PostgresDialect::new(), &model).unwrap().statements(),
            ["ALTER TABLE \"users\" ADD COLUMN \"slug\" TEXT"]
        );
    }

    #[test]
    fn test_unnamed_primary_key_drop_after_rename() {
        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        Refactoring::RenameTable {
            table: "users".to_string(),
            new_name: "members".to_string(),
        }
        .alter_model(&mut model)
        .unwrap();

        let unnamed = Refactoring::DropPrimaryKey {
            table: "members".to_string(),
            name: None,
        };
        let err = unnamed.alter_model(&mut model).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition(ref msg) if msg.contains("created on 'users'")));
        assert!(model.table("members").unwrap().primary_key().is_some());

        let named = Refactoring::DropPrimaryKey {
            table: "members".to_string(),
            name: Some("users_pkey".to_string()),
        };
        named.alter_model(&mut model).unwrap();
        assert_eq!(
            named.script(&PostgresDialect::new(), &model).unwrap().statements(),
            ["ALTER TABLE \"members\" DROP CONSTRAINT \"users_pkey\""]
        );
    }

    #[test]
    fn test_unknown_type_tag_rejected() {
        let result = serde_json::from_str::<Refactoring>(r#"{"type": "truncate-table", "table": "users"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_alter_model_sequence() {
        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        Refactoring::RenameColumn {
            table: "users".to_string(),
            column: "title".to_string(),
            new_name: "headline".to_string(),
        }
        .alter_model(&mut model)
        .unwrap();
        Refactoring::AddIndex {
            table: "users".to_string(),
            index: Index::new("idx_users_headline", ["headline"]),
        }
        .alter_model(&mut model)
        .unwrap();

        let users = model.table("users").unwrap();
        assert_eq!(users.index("idx_users_headline").unwrap().columns, ["headline"]);
    }

    #[test]
    fn test_duplicate_add_column_fails() {
        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        let add = Refactoring::AddColumn {
            table: "users".to_string(),
            column: Column::new("email", ColumnType::Text),
            position: None,
        };
        add.alter_model(&mut model).unwrap();
        assert!(matches!(
            add.alter_model(&mut model),
            Err(SchemaError::DuplicateName { kind: ObjectKind::Column, .. })
        ));
    }

    #[test]
    fn test_modify_column_merges_and_renders_full_definition() {
        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        let modify = Refactoring::ModifyColumn {
            table: "users".to_string(),
            column: ColumnChange::new("title").nullable(false),
        };
        modify.alter_model(&mut model).unwrap();

        let title = model.table("users").unwrap().column("title").unwrap();
        assert_eq!(title.column_type, ColumnType::Varchar(50));
        assert!(!title.nullable);

        let script = modify.script(&MysqlDialect::new(), &model).unwrap();
        assert_eq!(script.description(), "modify column users.title");
        assert_eq!(
            script.statements(),
            ["ALTER TABLE `users` MODIFY COLUMN `title` VARCHAR(50) NOT NULL"]
        );
    }

    #[test]
    fn test_custom_sql_leaves_model_alone() {
        let mut statements = BTreeMap::new();
        statements.insert("default".to_string(), vec!["UPDATE users SET title = ''".to_string()]);
        let custom = Refactoring::CustomSql {
            description: Some("blank titles".to_string()),
            statements,
        };

        let mut model = Database::new();
        create_users().alter_model(&mut model).unwrap();
        let before = model.clone();
        custom.alter_model(&mut model).unwrap();

        assert_eq!(model, before);
        assert_eq!(custom.description(), "custom SQL: blank titles");
        assert_eq!(custom.script(&PostgresDialect::new(), &model).unwrap().len(), 1);
    }
}
