//! Table-driven mapping from semantic column types to engine type names

use super::DialectError;
use crate::schema::{ColumnType, TypeKind};

/// How a mapped type name takes its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFormat {
    /// Bare name, arguments dropped
    Plain,
    /// `NAME(length)`; lengths above `max` use `overflow` when set, otherwise fail
    Length {
        max: u32,
        overflow: Option<&'static str>,
    },
    /// `NAME(precision,scale)`
    PrecisionScale { max_precision: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRule {
    pub kind: TypeKind,
    pub name: &'static str,
    pub format: TypeFormat,
}

impl TypeRule {
    pub const fn plain(kind: TypeKind, name: &'static str) -> Self {
        Self {
            kind,
            name,
            format: TypeFormat::Plain,
        }
    }

    pub const fn length(kind: TypeKind, name: &'static str, max: u32, overflow: Option<&'static str>) -> Self {
        Self {
            kind,
            name,
            format: TypeFormat::Length { max, overflow },
        }
    }

    pub const fn precision(kind: TypeKind, name: &'static str, max_precision: u8) -> Self {
        Self {
            kind,
            name,
            format: TypeFormat::PrecisionScale { max_precision },
        }
    }
}

/// A dialect's complete type table
#[derive(Debug)]
pub struct TypeMap {
    dialect: &'static str,
    rules: &'static [TypeRule],
}

impl TypeMap {
    pub const fn new(dialect: &'static str, rules: &'static [TypeRule]) -> Self {
        Self { dialect, rules }
    }

    pub fn rule(&self, kind: TypeKind) -> Option<&TypeRule> {
        self.rules.iter().find(|rule| rule.kind == kind)
    }

    /// Render `ty` as this dialect's type name
    pub fn render(&self, ty: &ColumnType) -> Result<String, DialectError> {
        let unsupported = || DialectError::UnsupportedType {
            column_type: ty.to_string(),
            dialect: self.dialect,
        };
        let rule = self.rule(ty.kind()).ok_or_else(unsupported)?;

        match (rule.format, ty) {
            (TypeFormat::Plain, _) => Ok(rule.name.to_string()),
            (TypeFormat::Length { max, overflow }, ColumnType::Varchar(len) | ColumnType::Char(len)) => {
                if *len <= max {
                    Ok(format!("{}({len})", rule.name))
                } else {
                    overflow.map(str::to_string).ok_or_else(unsupported)
                }
            }
            (TypeFormat::PrecisionScale { max_precision }, ColumnType::Decimal { precision, scale }) => {
                if *precision <= max_precision {
                    Ok(format!("{}({precision},{scale})", rule.name))
                } else {
                    Err(unsupported())
                }
            }
            // a rule whose format does not fit the type is a table error
            _ => Err(unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static RULES: &[TypeRule] = &[
        TypeRule::plain(TypeKind::Text, "CLOB"),
        TypeRule::length(TypeKind::Varchar, "VARCHAR", 100, Some("CLOB")),
        TypeRule::length(TypeKind::Char, "CHAR", 10, None),
        TypeRule::precision(TypeKind::Decimal, "NUMBER", 38),
    ];
    static MAP: TypeMap = TypeMap::new("test", RULES);

    #[test]
    fn test_render_with_arguments() {
        assert_eq!(MAP.render(&ColumnType::Varchar(20)).unwrap(), "VARCHAR(20)");
        assert_eq!(
            MAP.render(&ColumnType::Decimal { precision: 10, scale: 2 }).unwrap(),
            "NUMBER(10,2)"
        );
    }

    #[test]
    fn test_length_overflow() {
        assert_eq!(MAP.render(&ColumnType::Varchar(5000)).unwrap(), "CLOB");
        assert_eq!(
            MAP.render(&ColumnType::Char(11)),
            Err(DialectError::UnsupportedType {
                column_type: "CHAR(11)".to_string(),
                dialect: "test"
            })
        );
    }

    #[test]
    fn test_missing_rule() {
        assert!(matches!(
            MAP.render(&ColumnType::Boolean),
            Err(DialectError::UnsupportedType { .. })
        ));
        assert!(MAP
            .render(&ColumnType::Decimal { precision: 40, scale: 0 })
            .is_err());
    }
}
