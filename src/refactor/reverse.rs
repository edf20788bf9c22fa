use super::Refactoring;
use crate::schema::{ColumnPosition, Database};

impl Refactoring {
    /// The refactorings that undo this one
    ///
    /// `before` is the model as it was *before* this refactoring ran; drops
    /// need it to restore what they removed. Returns `None` when the change
    /// cannot be inverted (custom SQL) or `before` does not contain the
    /// dropped object.
    pub fn reverse(&self, before: &Database) -> Option<Vec<Refactoring>> {
        let reversed = match self {
            Refactoring::CreateTable { table, .. } => vec![Refactoring::DropTable { table: table.clone() }],
            Refactoring::DropTable { table } => {
                let dropped = before.table(table).ok()?;
                let mut steps = vec![Refactoring::CreateTable {
                    table: table.clone(),
                    columns: dropped.columns().to_vec(),
                    primary_key: dropped.primary_key().cloned(),
                }];
                steps.extend(dropped.indexes().iter().map(|index| Refactoring::AddIndex {
                    table: table.clone(),
                    index: index.clone(),
                }));
                steps.extend(dropped.foreign_keys().iter().map(|fk| Refactoring::AddForeignKey {
                    table: table.clone(),
                    foreign_key: fk.clone(),
                }));
                steps
            }
            Refactoring::RenameTable { table, new_name } => vec![Refactoring::RenameTable {
                table: new_name.clone(),
                new_name: table.clone(),
            }],
            Refactoring::AddColumn { table, column, .. } => vec![Refactoring::DropColumn {
                table: table.clone(),
                column: column.name.clone(),
            }],
            Refactoring::DropColumn { table, column } => {
                let owner = before.table(table).ok()?;
                let contains = |columns: &[String]| columns.iter().any(|c| c == column);

                let index = owner.columns().iter().position(|c| c.name == *column)?;
                // appending is only right when the column was last
                let position = (index + 1 < owner.columns().len())
                    .then(|| ColumnPosition::of(owner.columns(), index));

                let mut steps = vec![Refactoring::AddColumn {
                    table: table.clone(),
                    column: owner.columns()[index].clone(),
                    position,
                }];
                if let Some(pk) = owner.primary_key().filter(|pk| contains(&pk.columns)) {
                    steps.push(Refactoring::AddPrimaryKey {
                        table: table.clone(),
                        primary_key: pk.clone(),
                    });
                }
                steps.extend(
                    owner
                        .indexes()
                        .iter()
                        .filter(|index| contains(&index.columns))
                        .map(|index| Refactoring::AddIndex {
                            table: table.clone(),
                            index: index.clone(),
                        }),
                );
                steps.extend(
                    owner
                        .foreign_keys()
                        .iter()
                        .filter(|fk| {
                            contains(&fk.columns) || (fk.references == *table && contains(&fk.referenced_columns))
                        })
                        .map(|fk| Refactoring::AddForeignKey {
                            table: table.clone(),
                            foreign_key: fk.clone(),
                        }),
                );
                steps
            }
            Refactoring::RenameColumn {
                table,
                column,
                new_name,
            } => vec![Refactoring::RenameColumn {
                table: table.clone(),
                column: new_name.clone(),
                new_name: column.clone(),
            }],
            Refactoring::ModifyColumn { table, column } => {
                let original = before.table(table).ok()?.column(&column.name).ok()?;
                vec![Refactoring::ModifyColumn {
                    table: table.clone(),
                    column: column.restoring(original),
                }]
            }
            Refactoring::AddIndex { table, index } => vec![Refactoring::DropIndex {
                table: table.clone(),
                index: index.name.clone(),
            }],
            Refactoring::DropIndex { table, index } => vec![Refactoring::AddIndex {
                table: table.clone(),
                index: before.table(table).ok()?.index(index).ok()?.clone(),
            }],
            Refactoring::AddForeignKey { table, foreign_key } => vec![Refactoring::DropForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.name.clone(),
            }],
            Refactoring::DropForeignKey { table, foreign_key } => vec![Refactoring::AddForeignKey {
                table: table.clone(),
                foreign_key: before.table(table).ok()?.foreign_key(foreign_key).ok()?.clone(),
            }],
            Refactoring::AddPrimaryKey { table, primary_key } => vec![Refactoring::DropPrimaryKey {
                table: table.clone(),
                name: primary_key.name.clone(),
            }],
            Refactoring::DropPrimaryKey { table, .. } => vec![Refactoring::AddPrimaryKey {
                table: table.clone(),
                primary_key: before.table(table).ok()?.primary_key()?.clone(),
            }],
            Refactoring::CustomSql { .. } => return None,
        };
        Some(reversed)
    }
}
