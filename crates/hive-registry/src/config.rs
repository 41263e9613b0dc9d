use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hive_store::{JournalMode, SqliteOptions};

use crate::error::{RegistryError, RegistryResult};

/// How `add_key` and the auto-creating setters commit missing ancestors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestorCreation {
    /// The whole chain is created in one transaction, or none of it is.
    #[default]
    Atomic,
    /// Each ancestor commits on its own; a failure part way leaves the
    /// already-created prefix in place.
    Legacy,
}

/// Registry session settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Location of the registry database file.
    pub path: PathBuf,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
    pub ancestor_creation: AncestorCreation,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let sqlite = SqliteOptions::default();
        Self {
            path: PathBuf::from("/data/hive/registry.db"),
            journal_mode: sqlite.journal_mode,
            foreign_keys: sqlite.foreign_keys,
            busy_timeout_ms: sqlite.busy_timeout_ms,
            ancestor_creation: AncestorCreation::default(),
        }
    }
}

impl RegistryConfig {
    /// Default settings for the registry file at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse settings from TOML. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> RegistryResult<Self> {
        toml::from_str(text).map_err(|e| RegistryError::Config(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn load(file: &Path) -> RegistryResult<Self> {
        let text = fs::read_to_string(file)
            .map_err(|e| RegistryError::Config(format!("{}: {e}", file.display())))?;
        Self::from_toml_str(&text)
    }

    /// Connection settings for the SQLite backend.
    pub fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            journal_mode: self.journal_mode,
            foreign_keys: self.foreign_keys,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }
}
