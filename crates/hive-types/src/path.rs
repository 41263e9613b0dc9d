//! Key path parsing.
//!
//! A key path is a `/`-separated sequence of segment names:
//! - Empty segments are skipped, so `//a///b` names the same key as `/a/b`
//!   and the leading slash is optional
//! - At least one segment is required; `""` and `/` (the root) are invalid
//! - Segments must not contain NUL

use std::fmt;

use crate::error::{TypeError, TypeResult};

/// Separator between segments.
pub const SEPARATOR: char = '/';

/// A parsed key path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a key path.
    ///
    /// # Examples
    ///
    /// ```
    /// use hive_types::KeyPath;
    ///
    /// let path = KeyPath::parse("/device/net/mac").unwrap();
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path.leaf(), "mac");
    /// assert!(KeyPath::parse("/").is_err());
    /// ```
    pub fn parse(path: &str) -> TypeResult<Self> {
        let segments: Vec<String> = path
            .split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            let reason = if path.is_empty() {
                "path must not be empty"
            } else {
                "the root key cannot be addressed"
            };
            return Err(TypeError::InvalidPath {
                path: path.to_string(),
                reason: reason.into(),
            });
        }

        if let Some(bad) = segments.iter().find(|segment| segment.contains('\0')) {
            return Err(TypeError::InvalidPath {
                path: path.to_string(),
                reason: format!("segment contains NUL: {bad:?}"),
            });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. Always at least one.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; a parsed path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The path made of the first `depth` segments, or `None` when `depth`
    /// is zero (the root) or longer than this path.
    pub fn ancestor(&self, depth: usize) -> Option<KeyPath> {
        if depth == 0 || depth > self.segments.len() {
            return None;
        }
        Some(KeyPath {
            segments: self.segments[..depth].to_vec(),
        })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{SEPARATOR}{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyPath {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        KeyPath::parse(s)
    }
}
