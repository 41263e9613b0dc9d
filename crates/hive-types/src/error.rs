use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The key path is empty, names only the root, or contains a bad segment.
    #[error("invalid key path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A stored type tag outside the known range.
    #[error("unknown key type tag: {0}")]
    UnknownTag(i64),
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
