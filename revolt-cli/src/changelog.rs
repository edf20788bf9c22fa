//! Changelog files
//!
//! A changelog declares the ordered refactorings, either as TOML
//! (`[[refactoring]]` tables) or as JSON (`{"refactoring": [...]}`). The
//! format is picked from the file extension.

use revolt::Refactoring;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error("failed to read changelog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in changelog {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in changelog {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported changelog format for {0} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangelogFormat {
    Toml,
    Json,
}

impl ChangelogFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(ChangelogFormat::Toml),
            "json" => Some(ChangelogFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(default, rename = "refactoring")]
    pub refactorings: Vec<Refactoring>,
}

impl Changelog {
    /// Read and parse a changelog file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChangelogError> {
        let path = path.as_ref();
        let format = ChangelogFormat::from_path(path)
            .ok_or_else(|| ChangelogError::UnsupportedFormat(path.to_path_buf()))?;
        let source = std::fs::read_to_string(path).map_err(|source| ChangelogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let changelog = match format {
            ChangelogFormat::Toml => toml::from_str(&source).map_err(|source| ChangelogError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            ChangelogFormat::Json => serde_json::from_str(&source).map_err(|source| ChangelogError::Json {
                path: path.to_path_buf(),
                source,
            })?,
        };
        log::debug!("Loaded changelog {}", path.display());
        Ok(changelog)
    }

    pub fn len(&self) -> usize {
        self.refactorings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refactorings.is_empty()
    }
}
