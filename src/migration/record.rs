//! `VersionRecord` - the data row of the `revolt_version` table

use crate::executor::SqlValue;
use crate::migration::MigrationError;

/// Stored migration marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Number of declared refactorings applied so far
    pub version: usize,

    /// `SHA-256` checksum of the applied prefix (empty when nothing was applied)
    pub checksum: String,
}

impl VersionRecord {
    #[must_use]
    pub fn new(version: usize, checksum: impl Into<String>) -> Self {
        Self {
            version,
            checksum: checksum.into(),
        }
    }

    /// Build from a `SELECT version, checksum` row
    pub fn from_row(row: &[SqlValue]) -> Result<Self, MigrationError> {
        let version = row
            .first()
            .and_then(SqlValue::as_i64)
            .ok_or_else(|| MigrationError::InvalidFormat(format!("version column missing in {row:?}")))?;
        let version = usize::try_from(version)
            .map_err(|_| MigrationError::InvalidFormat(format!("negative version {version}")))?;
        let checksum = match row.get(1) {
            Some(SqlValue::Text(s)) => s.clone(),
            Some(SqlValue::Null) | None => String::new(),
            Some(other) => {
                return Err(MigrationError::InvalidFormat(format!(
                    "checksum column has unexpected value {other:?}"
                )))
            }
        };
        Ok(Self { version, checksum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row() {
        let record = VersionRecord::from_row(&[SqlValue::Int(4), SqlValue::Text("ab12".to_string())]).unwrap();
        assert_eq!(record, VersionRecord::new(4, "ab12"));

        let record = VersionRecord::from_row(&[SqlValue::Int(0), SqlValue::Null]).unwrap();
        assert_eq!(record.checksum, "");
    }

    #[test]
    fn test_from_row_rejects_bad_values() {
        assert!(matches!(
            VersionRecord::from_row(&[SqlValue::Int(-3), SqlValue::Null]),
            Err(MigrationError::InvalidFormat(_))
        ));
        assert!(VersionRecord::from_row(&[]).is_err());
    }
}
