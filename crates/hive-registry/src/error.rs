use std::path::PathBuf;

use thiserror::Error;

use hive_store::{StorageErrorKind, StoreError};
use hive_types::TypeError;

/// Errors returned by registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("key already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid key path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Another session already holds this registry file.
    #[error("registry busy: {} is already open", .0.display())]
    Busy(PathBuf),

    /// Stored data violates the registry's invariants.
    #[error("registry corrupt at {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

impl RegistryError {
    pub(crate) fn corrupt(path: impl ToString, reason: impl Into<String>) -> Self {
        RegistryError::Corrupt {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// The translated storage category, if this error came from the backend.
    ///
    /// Session contention reports [`StorageErrorKind::Busy`] as well.
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            RegistryError::Store(err) => Some(err.kind()),
            RegistryError::Busy(_) => Some(StorageErrorKind::Busy),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }
}

impl From<TypeError> for RegistryError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidPath { path, reason } => RegistryError::InvalidPath { path, reason },
            TypeError::UnknownTag(tag) => {
                RegistryError::corrupt("<unknown key>", format!("type tag {tag} out of range"))
            }
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
