//! Column definitions and semantic column types

use super::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z ]*?)\s*(?:\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\))?\s*$")
        .expect("column type pattern is valid")
});

/// Semantic column type
///
/// Dialects map these to engine-specific type names. The textual form
/// (`VARCHAR(50)`, `DECIMAL(10,2)`) is what changelogs use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    BigInt,
    SmallInt,
    Varchar(u32),
    Char(u32),
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Decimal { precision: u8, scale: u8 },
    Float,
    Double,
    Blob,
}

/// Payload-free discriminant of [`ColumnType`], used as the key of dialect type maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Integer,
    BigInt,
    SmallInt,
    Varchar,
    Char,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Decimal,
    Float,
    Double,
    Blob,
}

impl ColumnType {
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        match self {
            ColumnType::Integer => TypeKind::Integer,
            ColumnType::BigInt => TypeKind::BigInt,
            ColumnType::SmallInt => TypeKind::SmallInt,
            ColumnType::Varchar(_) => TypeKind::Varchar,
            ColumnType::Char(_) => TypeKind::Char,
            ColumnType::Text => TypeKind::Text,
            ColumnType::Boolean => TypeKind::Boolean,
            ColumnType::Date => TypeKind::Date,
            ColumnType::Time => TypeKind::Time,
            ColumnType::Timestamp => TypeKind::Timestamp,
            ColumnType::Decimal { .. } => TypeKind::Decimal,
            ColumnType::Float => TypeKind::Float,
            ColumnType::Double => TypeKind::Double,
            ColumnType::Blob => TypeKind::Blob,
        }
    }

    /// Whether the type can back an auto-increment column
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::BigInt | ColumnType::SmallInt
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("INTEGER"),
            ColumnType::BigInt => f.write_str("BIGINT"),
            ColumnType::SmallInt => f.write_str("SMALLINT"),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({len})"),
            ColumnType::Char(len) => write!(f, "CHAR({len})"),
            ColumnType::Text => f.write_str("TEXT"),
            ColumnType::Boolean => f.write_str("BOOLEAN"),
            ColumnType::Date => f.write_str("DATE"),
            ColumnType::Time => f.write_str("TIME"),
            ColumnType::Timestamp => f.write_str("TIMESTAMP"),
            ColumnType::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            ColumnType::Float => f.write_str("FLOAT"),
            ColumnType::Double => f.write_str("DOUBLE"),
            ColumnType::Blob => f.write_str("BLOB"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SchemaError::InvalidDefinition(format!("column type '{s}': {reason}"));

        let caps = TYPE_PATTERN
            .captures(s)
            .ok_or_else(|| invalid("unrecognized syntax"))?;
        let name = caps[1].split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let first = caps
            .get(2)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| invalid("argument out of range"))?;
        let second = caps
            .get(3)
            .map(|m| m.as_str().parse::<u32>())
            .transpose()
            .map_err(|_| invalid("argument out of range"))?;

        let plain = |ty: ColumnType| {
            if first.is_some() {
                Err(invalid("type takes no arguments"))
            } else {
                Ok(ty)
            }
        };

        match name.as_str() {
            "INTEGER" | "INT" => plain(ColumnType::Integer),
            "BIGINT" => plain(ColumnType::BigInt),
            "SMALLINT" => plain(ColumnType::SmallInt),
            "TEXT" => plain(ColumnType::Text),
            "BOOLEAN" | "BOOL" => plain(ColumnType::Boolean),
            "DATE" => plain(ColumnType::Date),
            "TIME" => plain(ColumnType::Time),
            "TIMESTAMP" | "DATETIME" => plain(ColumnType::Timestamp),
            "FLOAT" | "REAL" => plain(ColumnType::Float),
            "DOUBLE" | "DOUBLE PRECISION" => plain(ColumnType::Double),
            "BLOB" | "BINARY" => plain(ColumnType::Blob),
            "VARCHAR" | "CHAR" => {
                if second.is_some() {
                    return Err(invalid("length takes a single argument"));
                }
                match first {
                    Some(0) | None => Err(invalid("a positive length is required")),
                    Some(len) if name == "VARCHAR" => Ok(ColumnType::Varchar(len)),
                    Some(len) => Ok(ColumnType::Char(len)),
                }
            }
            "DECIMAL" | "NUMERIC" => {
                let precision = first.ok_or_else(|| invalid("precision is required"))?;
                let scale = second.unwrap_or(0);
                if precision == 0 || precision > u32::from(u8::MAX) {
                    return Err(invalid("precision must be between 1 and 255"));
                }
                if scale > precision {
                    return Err(invalid("scale cannot exceed precision"));
                }
                // bounds checked above
                Ok(ColumnType::Decimal {
                    precision: precision as u8,
                    scale: scale as u8,
                })
            }
            _ => Err(invalid("unknown type")),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

fn default_nullable() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A column of a table
///
/// `default` holds SQL text (a literal such as `'x'` or `0`, or an
/// expression such as `CURRENT_TIMESTAMP`) and is emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
}

impl Column {
    /// Create a nullable column without default
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            auto_increment: false,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }

    /// Overlay the attributes specified in `change` onto this column
    ///
    /// Unspecified attributes are left untouched. The column name is never
    /// changed by a merge; renames go through `RenameColumn`.
    pub fn merge(&mut self, change: &ColumnChange) {
        if let Some(column_type) = change.column_type {
            self.column_type = column_type;
        }
        if let Some(nullable) = change.nullable {
            self.nullable = nullable;
        }
        if change.drop_default {
            self.default = None;
        } else if let Some(default) = &change.default {
            self.default = Some(default.clone());
        }
        if let Some(auto_increment) = change.auto_increment {
            self.auto_increment = auto_increment;
        }
    }
}

/// Where `AddColumn` places a column; without one the column is appended
///
/// Written `position = "first"` or `position = { after = "id" }` in a changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPosition {
    First,
    After(String),
}

impl ColumnPosition {
    /// The position of the column at `index` in `columns`
    pub fn of(columns: &[Column], index: usize) -> Self {
        match index.checked_sub(1).and_then(|prev| columns.get(prev)) {
            Some(prev) => ColumnPosition::After(prev.name.clone()),
            None => ColumnPosition::First,
        }
    }
}

impl fmt::Display for ColumnPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnPosition::First => f.write_str("first"),
            ColumnPosition::After(column) => write!(f, "after {column}"),
        }
    }
}

/// Partial column definition used by `ModifyColumn`
///
/// Every `None` attribute means "leave as is". `drop_default` removes the
/// current default and wins over `default`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub drop_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_increment: Option<bool>,
}

impl ColumnChange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn column_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = Some(column_type);
        self
    }

    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self.drop_default = false;
        self
    }

    #[must_use]
    pub fn drop_default(mut self) -> Self {
        self.default = None;
        self.drop_default = true;
        self
    }

    /// Whether the change touches the column default at all
    #[must_use]
    pub fn changes_default(&self) -> bool {
        self.drop_default || self.default.is_some()
    }

    /// The change that restores `original` for every attribute this change touches
    #[must_use]
    pub fn restoring(&self, original: &Column) -> ColumnChange {
        let mut restore = ColumnChange::new(original.name.clone());
        if self.column_type.is_some() {
            restore.column_type = Some(original.column_type);
        }
        if self.nullable.is_some() {
            restore.nullable = Some(original.nullable);
        }
        if self.changes_default() {
            match &original.default {
                Some(default) => restore.default = Some(default.clone()),
                None => restore.drop_default = true,
            }
        }
        if self.auto_increment.is_some() {
            restore.auto_increment = Some(original.auto_increment);
        }
        restore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_types() {
        assert_eq!("integer".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("INT".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("VARCHAR(50)".parse::<ColumnType>().unwrap(), ColumnType::Varchar(50));
        assert_eq!("char( 2 )".parse::<ColumnType>().unwrap(), ColumnType::Char(2));
        assert_eq!(
            "DECIMAL(10, 2)".parse::<ColumnType>().unwrap(),
            ColumnType::Decimal { precision: 10, scale: 2 }
        );
        assert_eq!(
            "numeric(8)".parse::<ColumnType>().unwrap(),
            ColumnType::Decimal { precision: 8, scale: 0 }
        );
        assert_eq!("double precision".parse::<ColumnType>().unwrap(), ColumnType::Double);
        assert_eq!("datetime".parse::<ColumnType>().unwrap(), ColumnType::Timestamp);
    }

    #[test]
    fn test_parse_column_types_invalid() {
        for bad in ["VARCHAR", "VARCHAR(0)", "TEXT(5)", "DECIMAL", "DECIMAL(2,3)", "UUID", "INT(", ""] {
            assert!(bad.parse::<ColumnType>().is_err(), "should reject {bad:?}");
        }
    }

    #[test]
    fn test_column_type_display_round_trips() {
        for ty in [
            ColumnType::Varchar(255),
            ColumnType::Decimal { precision: 12, scale: 4 },
            ColumnType::Timestamp,
            ColumnType::Blob,
        ] {
            assert_eq!(ty.to_string().parse::<ColumnType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_merge_leaves_unspecified_fields() {
        let mut column = Column::new("title", ColumnType::Varchar(50)).default_value("'x'");
        assert!(column.nullable);

        column.merge(&ColumnChange::new("title").nullable(false));

        assert_eq!(column.column_type, ColumnType::Varchar(50));
        assert!(!column.nullable);
        assert_eq!(column.default.as_deref(), Some("'x'"));
        assert!(!column.auto_increment);
    }

    #[test]
    fn test_merge_type_and_drop_default() {
        let mut column = Column::new("amount", ColumnType::Integer).default_value("0");
        column.merge(
            &ColumnChange::new("amount")
                .column_type(ColumnType::Decimal { precision: 10, scale: 2 })
                .drop_default(),
        );
        assert_eq!(column.column_type, ColumnType::Decimal { precision: 10, scale: 2 });
        assert_eq!(column.default, None);
        assert!(column.nullable);
    }

    #[test]
    fn test_restoring_change_undoes_merge() {
        let original = Column::new("status", ColumnType::Varchar(20));
        let change = ColumnChange::new("status")
            .column_type(ColumnType::Text)
            .nullable(false)
            .default_value("'new'");

        let mut column = original.clone();
        column.merge(&change);
        column.merge(&change.restoring(&original));

        assert_eq!(column, original);
    }

    #[test]
    fn test_column_deserializes_with_defaults() {
        let column: Column = serde_json::from_str(r#"{"name": "email", "type": "varchar(255)"}"#).unwrap();
        assert_eq!(column, Column::new("email", ColumnType::Varchar(255)));

        let err = serde_json::from_str::<Column>(r#"{"name": "email", "type": "money"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }
}
