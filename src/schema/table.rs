//! Tables and their indexes and constraints

use super::{validate_identifier, Column, ColumnChange, ColumnPosition, ObjectKind, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Referential action applied when the referenced row is deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnDelete {
    #[default]
    None,
    Cascade,
    SetNull,
}

impl fmt::Display for OnDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnDelete::None => f.write_str("NONE"),
            OnDelete::Cascade => f.write_str("CASCADE"),
            OnDelete::SetNull => f.write_str("SET NULL"),
        }
    }
}

/// Secondary index on a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl Index {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Foreign key constraint owned by the referencing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub references: String,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl ForeignKey {
    pub fn new<I, S, J, T>(
        name: impl Into<String>,
        columns: I,
        references: impl Into<String>,
        referenced_columns: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            references: references.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
            on_delete: OnDelete::None,
        }
    }

    #[must_use]
    pub fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = action;
        self
    }
}

/// Primary key constraint; `name` is optional since most engines generate one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl PrimaryKey {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A table: ordered columns plus indexes, foreign keys and primary key
///
/// Indexes and foreign keys are kept sorted by name, so dropping one and
/// adding it back yields an equal table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    indexes: Vec<Index>,
    foreign_keys: Vec<ForeignKey>,
    primary_key: Option<PrimaryKey>,
    /// Table name an unnamed primary key was created under; engines derive
    /// the constraint name from it and keep it across renames
    key_origin: Option<String>,
}

// key_origin is bookkeeping for constraint names, not part of the schema
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.indexes == other.indexes
            && self.foreign_keys == other.foreign_keys
            && self.primary_key == other.primary_key
    }
}

impl Eq for Table {}

fn rename_in(names: &mut [String], old: &str, new: &str) {
    for name in names.iter_mut().filter(|n| n.as_str() == old) {
        *name = new.to_string();
    }
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self {
            name,
            ..Self::default()
        })
    }

    /// Create a table with the given columns, rejecting duplicates
    pub fn with_columns(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = Column>,
    ) -> Result<Self, SchemaError> {
        let mut table = Self::new(name)?;
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Assemble a table without validation, for rendering a definition that is not in a model
    pub(crate) fn unchecked(name: &str, columns: &[Column], primary_key: Option<&PrimaryKey>) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.to_vec(),
            primary_key: primary_key.cloned(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn scope(&self) -> String {
        format!("table '{}'", self.name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Look up a column, failing with `UnknownColumn`
    pub fn column(&self, name: &str) -> Result<&Column, SchemaError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SchemaError::unknown_column(&self.name, name))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column, SchemaError> {
        let table = &self.name;
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| SchemaError::unknown_column(table, name))
    }

    fn require_columns(&self, columns: &[String], what: &str) -> Result<(), SchemaError> {
        if columns.is_empty() {
            return Err(SchemaError::InvalidDefinition(format!(
                "{what} on table '{}' has no columns",
                self.name
            )));
        }
        for column in columns {
            self.column(column)?;
        }
        Ok(())
    }

    /// Append a column
    pub fn add_column(&mut self, column: Column) -> Result<(), SchemaError> {
        self.insert_column(column, None)
    }

    /// Add a column at `position`, or at the end when there is none
    pub fn insert_column(&mut self, column: Column, position: Option<&ColumnPosition>) -> Result<(), SchemaError> {
        validate_identifier(&column.name)?;
        if self.has_column(&column.name) {
            return Err(SchemaError::duplicate(ObjectKind::Column, &column.name, self.scope()));
        }
        if column.auto_increment && !column.column_type.is_integer() {
            return Err(SchemaError::InvalidDefinition(format!(
                "auto-increment column '{}.{}' must have an integer type",
                self.name, column.name
            )));
        }
        let index = match position {
            None => self.columns.len(),
            Some(ColumnPosition::First) => 0,
            Some(ColumnPosition::After(prev)) => {
                self.columns
                    .iter()
                    .position(|c| c.name == *prev)
                    .ok_or_else(|| SchemaError::unknown_column(&self.name, prev))?
                    + 1
            }
        };
        self.columns.insert(index, column);
        Ok(())
    }

    /// Remove a column together with the indexes and constraints that contain it
    pub fn drop_column(&mut self, name: &str) -> Result<Column, SchemaError> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError::unknown_column(&self.name, name))?;
        let column = self.columns.remove(position);

        let contains = |columns: &[String]| columns.iter().any(|c| c == name);
        self.indexes.retain(|index| !contains(&index.columns));
        self.foreign_keys.retain(|fk| !contains(&fk.columns));
        if self.primary_key.as_ref().is_some_and(|pk| contains(&pk.columns)) {
            self.primary_key = None;
            self.key_origin = None;
        }
        Ok(column)
    }

    /// Rename a column and every local reference to it
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<(), SchemaError> {
        validate_identifier(new)?;
        if self.has_column(new) {
            return Err(SchemaError::duplicate(ObjectKind::Column, new, self.scope()));
        }
        self.column_mut(old)?.name = new.to_string();

        for index in &mut self.indexes {
            rename_in(&mut index.columns, old, new);
        }
        for fk in &mut self.foreign_keys {
            rename_in(&mut fk.columns, old, new);
        }
        if let Some(pk) = &mut self.primary_key {
            rename_in(&mut pk.columns, old, new);
        }
        Ok(())
    }

    /// Merge a partial definition onto an existing column
    pub fn modify_column(&mut self, change: &ColumnChange) -> Result<(), SchemaError> {
        let table = self.name.clone();
        let column = self.column_mut(&change.name)?;
        let mut merged = column.clone();
        merged.merge(change);
        if merged.auto_increment && !merged.column_type.is_integer() {
            return Err(SchemaError::InvalidDefinition(format!(
                "auto-increment column '{table}.{}' must have an integer type",
                merged.name
            )));
        }
        *column = merged;
        Ok(())
    }

    pub fn index(&self, name: &str) -> Result<&Index, SchemaError> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| SchemaError::UnknownIndex {
                table: self.name.clone(),
                index: name.to_string(),
            })
    }

    pub fn add_index(&mut self, index: Index) -> Result<(), SchemaError> {
        validate_identifier(&index.name)?;
        if self.indexes.iter().any(|i| i.name == index.name) {
            return Err(SchemaError::duplicate(ObjectKind::Index, &index.name, self.scope()));
        }
        self.require_columns(&index.columns, "index")?;
        let at = self.indexes.partition_point(|i| i.name < index.name);
        self.indexes.insert(at, index);
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) -> Result<Index, SchemaError> {
        let position = self
            .indexes
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| SchemaError::UnknownIndex {
                table: self.name.clone(),
                index: name.to_string(),
            })?;
        Ok(self.indexes.remove(position))
    }

    pub fn foreign_key(&self, name: &str) -> Result<&ForeignKey, SchemaError> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.name == name)
            .ok_or_else(|| SchemaError::UnknownForeignKey {
                table: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Attach a foreign key whose referenced side was already validated by the database
    pub(crate) fn push_foreign_key(&mut self, fk: ForeignKey) -> Result<(), SchemaError> {
        validate_identifier(&fk.name)?;
        if self.foreign_keys.iter().any(|f| f.name == fk.name) {
            return Err(SchemaError::duplicate(ObjectKind::ForeignKey, &fk.name, self.scope()));
        }
        self.require_columns(&fk.columns, "foreign key")?;
        let at = self.foreign_keys.partition_point(|f| f.name < fk.name);
        self.foreign_keys.insert(at, fk);
        Ok(())
    }

    pub fn drop_foreign_key(&mut self, name: &str) -> Result<ForeignKey, SchemaError> {
        let position = self
            .foreign_keys
            .iter()
            .position(|fk| fk.name == name)
            .ok_or_else(|| SchemaError::UnknownForeignKey {
                table: self.name.clone(),
                name: name.to_string(),
            })?;
        Ok(self.foreign_keys.remove(position))
    }

    pub fn set_primary_key(&mut self, primary_key: PrimaryKey) -> Result<(), SchemaError> {
        if let Some(existing) = &self.primary_key {
            let name = existing.name.as_deref().unwrap_or("primary key");
            return Err(SchemaError::duplicate(ObjectKind::PrimaryKey, name, self.scope()));
        }
        if let Some(name) = &primary_key.name {
            validate_identifier(name)?;
        }
        self.require_columns(&primary_key.columns, "primary key")?;
        self.key_origin = primary_key.name.is_none().then(|| self.name.clone());
        self.primary_key = Some(primary_key);
        Ok(())
    }

    pub fn drop_primary_key(&mut self) -> Result<PrimaryKey, SchemaError> {
        self.key_origin = None;
        self.primary_key
            .take()
            .ok_or_else(|| SchemaError::MissingPrimaryKey(self.name.clone()))
    }

    /// Name of the table an unnamed primary key was added to, if it has been renamed since
    pub fn renamed_key_origin(&self) -> Option<&str> {
        self.key_origin.as_deref().filter(|origin| *origin != self.name)
    }

    /// Foreign keys of this table referencing `table` (and optionally `column`)
    pub(crate) fn references_to<'a>(
        &'a self,
        table: &'a str,
        column: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign_keys.iter().filter(move |fk| {
            fk.references == table
                && column.map_or(true, |c| fk.referenced_columns.iter().any(|rc| rc == c))
        })
    }

    pub(crate) fn retarget_references(&mut self, old_table: &str, new_table: &str) {
        for fk in self.foreign_keys.iter_mut().filter(|fk| fk.references == old_table) {
            fk.references = new_table.to_string();
        }
    }

    pub(crate) fn rename_referenced_column(&mut self, table: &str, old: &str, new: &str) {
        for fk in self.foreign_keys.iter_mut().filter(|fk| fk.references == table) {
            rename_in(&mut fk.referenced_columns, old, new);
        }
    }
}
