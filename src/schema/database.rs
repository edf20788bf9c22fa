use super::{validate_identifier, ForeignKey, ObjectKind, SchemaError, Table};
use std::collections::BTreeMap;

/// The desired schema: tables keyed by name
///
/// Iteration is ordered by table name so that rendered output and error
/// messages are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn table(&self, name: &str) -> Result<&Table, SchemaError> {
        self.tables
            .get(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table, SchemaError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn add_table(&mut self, table: Table) -> Result<(), SchemaError> {
        validate_identifier(table.name())?;
        if self.has_table(table.name()) {
            return Err(SchemaError::duplicate(ObjectKind::Table, table.name(), "database"));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// First foreign key outside `table` that points at it (optionally at `column`)
    fn referenced_by<'a>(
        &'a self,
        table: &'a str,
        column: Option<&'a str>,
    ) -> Option<(&'a str, &'a ForeignKey)> {
        self.tables
            .values()
            .filter(|t| t.name() != table)
            .find_map(move |t| t.references_to(table, column).next().map(|fk| (t.name(), fk)))
    }

    /// Remove a table; fails while another table still references it
    pub fn drop_table(&mut self, name: &str) -> Result<Table, SchemaError> {
        self.table(name)?;
        if let Some((referencing, fk)) = self.referenced_by(name, None) {
            return Err(SchemaError::Referenced {
                object: format!("table '{name}'"),
                referencing_table: referencing.to_string(),
                foreign_key: fk.name.clone(),
            });
        }
        self.tables
            .remove(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }

    /// Rename a table and retarget every foreign key that references it
    pub fn rename_table(&mut self, old: &str, new: &str) -> Result<(), SchemaError> {
        validate_identifier(new)?;
        if self.has_table(new) {
            return Err(SchemaError::duplicate(ObjectKind::Table, new, "database"));
        }
        let mut table = self
            .tables
            .remove(old)
            .ok_or_else(|| SchemaError::UnknownTable(old.to_string()))?;
        table.set_name(new.to_string());
        self.tables.insert(new.to_string(), table);

        for table in self.tables.values_mut() {
            table.retarget_references(old, new);
        }
        Ok(())
    }

    /// Rename a column, including references to it from other tables' foreign keys
    pub fn rename_column(&mut self, table: &str, old: &str, new: &str) -> Result<(), SchemaError> {
        self.table_mut(table)?.rename_column(old, new)?;
        for other in self.tables.values_mut() {
            other.rename_referenced_column(table, old, new);
        }
        Ok(())
    }

    /// Drop a column; fails while another table's foreign key points at it
    pub fn drop_column(&mut self, table: &str, column: &str) -> Result<(), SchemaError> {
        self.table(table)?.column(column)?;
        if let Some((referencing, fk)) = self.referenced_by(table, Some(column)) {
            return Err(SchemaError::Referenced {
                object: format!("column '{table}.{column}'"),
                referencing_table: referencing.to_string(),
                foreign_key: fk.name.clone(),
            });
        }
        // self-referencing keys go away with the column
        let owner = self.table_mut(table)?;
        let self_refs: Vec<String> = owner
            .references_to(table, Some(column))
            .map(|fk| fk.name.clone())
            .collect();
        for name in self_refs {
            owner.drop_foreign_key(&name)?;
        }
        owner.drop_column(column)?;
        Ok(())
    }

    /// Attach a foreign key to `table` after validating both sides
    pub fn add_foreign_key(&mut self, table: &str, fk: ForeignKey) -> Result<(), SchemaError> {
        if fk.columns.len() != fk.referenced_columns.len() {
            return Err(SchemaError::InvalidDefinition(format!(
                "foreign key '{}' maps {} column(s) onto {}",
                fk.name,
                fk.columns.len(),
                fk.referenced_columns.len()
            )));
        }
        if fk.referenced_columns.is_empty() {
            return Err(SchemaError::InvalidDefinition(format!(
                "foreign key '{}' has no columns",
                fk.name
            )));
        }
        let target = self.table(&fk.references)?;
        for column in &fk.referenced_columns {
            target.column(column)?;
        }
        self.table_mut(table)?.push_foreign_key(fk)
    }
}
