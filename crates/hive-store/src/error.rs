use crate::translate::StorageErrorKind;

/// Errors from node store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A backend operation failed; `kind` is the translated category.
    #[error("storage error ({kind}): {message}")]
    Storage {
        kind: StorageErrorKind,
        message: String,
    },

    /// The database was written by a newer schema than this build supports.
    #[error("unsupported schema version {found} (supported: {supported})")]
    SchemaVersion { found: i64, supported: i64 },

    /// I/O error outside the backend (e.g. creating the database directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn storage(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        StoreError::Storage {
            kind,
            message: message.into(),
        }
    }

    /// The translated category of this error.
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            StoreError::Storage { kind, .. } => *kind,
            StoreError::SchemaVersion { .. } => StorageErrorKind::FormatError,
            StoreError::Io(_) => StorageErrorKind::Io,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
