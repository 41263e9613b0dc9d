//! Translation of backend status codes into the registry's error domain.
//!
//! SQLite reports failures as integer result codes. [`translate`] folds every
//! primary code into a small closed set of [`StorageErrorKind`]s; extended
//! codes are reduced to their primary code first. Codes this table does not
//! know become [`StorageErrorKind::Unknown`], never success.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// SQLite primary result codes.
pub mod codes {
    pub const OK: i32 = 0;
    pub const ERROR: i32 = 1;
    pub const INTERNAL: i32 = 2;
    pub const PERM: i32 = 3;
    pub const ABORT: i32 = 4;
    pub const BUSY: i32 = 5;
    pub const LOCKED: i32 = 6;
    pub const NOMEM: i32 = 7;
    pub const READONLY: i32 = 8;
    pub const INTERRUPT: i32 = 9;
    pub const IOERR: i32 = 10;
    pub const CORRUPT: i32 = 11;
    pub const NOTFOUND: i32 = 12;
    pub const FULL: i32 = 13;
    pub const CANTOPEN: i32 = 14;
    pub const PROTOCOL: i32 = 15;
    pub const EMPTY: i32 = 16;
    pub const SCHEMA: i32 = 17;
    pub const TOOBIG: i32 = 18;
    pub const CONSTRAINT: i32 = 19;
    pub const MISMATCH: i32 = 20;
    pub const MISUSE: i32 = 21;
    pub const NOLFS: i32 = 22;
    pub const AUTH: i32 = 23;
    pub const FORMAT: i32 = 24;
    pub const RANGE: i32 = 25;
    pub const NOTADB: i32 = 26;
    pub const ROW: i32 = 100;
    pub const DONE: i32 = 101;
}

/// Uniform category of a storage failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageErrorKind {
    Success,
    Io,
    PermissionDenied,
    Busy,
    OutOfMemory,
    ReadOnly,
    Interrupted,
    Corrupt,
    /// Backend-level "not found", distinct from a missing key path.
    NotFound,
    NoSpace,
    Overflow,
    ConstraintViolation,
    Misuse,
    Unsupported,
    PermissionAuth,
    FormatError,
    RangeError,
    NotAStore,
    /// A code outside the translation table, carried verbatim.
    Unknown(i32),
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageErrorKind::Success => "success",
            StorageErrorKind::Io => "i/o failure",
            StorageErrorKind::PermissionDenied => "permission denied",
            StorageErrorKind::Busy => "busy",
            StorageErrorKind::OutOfMemory => "out of memory",
            StorageErrorKind::ReadOnly => "read-only",
            StorageErrorKind::Interrupted => "interrupted",
            StorageErrorKind::Corrupt => "corrupt",
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::NoSpace => "no space",
            StorageErrorKind::Overflow => "overflow",
            StorageErrorKind::ConstraintViolation => "constraint violation",
            StorageErrorKind::Misuse => "misuse",
            StorageErrorKind::Unsupported => "unsupported",
            StorageErrorKind::PermissionAuth => "authorization denied",
            StorageErrorKind::FormatError => "format error",
            StorageErrorKind::RangeError => "range error",
            StorageErrorKind::NotAStore => "not a registry store",
            StorageErrorKind::Unknown(code) => return write!(f, "unknown storage error {code}"),
        };
        f.write_str(name)
    }
}

/// Map an SQLite result code to its category.
pub fn translate(code: i32) -> StorageErrorKind {
    use codes::*;

    match code & 0xff {
        OK | ROW | DONE => StorageErrorKind::Success,
        ERROR | INTERNAL | ABORT | LOCKED | IOERR | CANTOPEN | PROTOCOL | SCHEMA | MISMATCH => {
            StorageErrorKind::Io
        }
        PERM => StorageErrorKind::PermissionDenied,
        BUSY => StorageErrorKind::Busy,
        NOMEM => StorageErrorKind::OutOfMemory,
        READONLY => StorageErrorKind::ReadOnly,
        INTERRUPT => StorageErrorKind::Interrupted,
        CORRUPT => StorageErrorKind::Corrupt,
        NOTFOUND | EMPTY => StorageErrorKind::NotFound,
        FULL => StorageErrorKind::NoSpace,
        TOOBIG => StorageErrorKind::Overflow,
        CONSTRAINT => StorageErrorKind::ConstraintViolation,
        MISUSE => StorageErrorKind::Misuse,
        NOLFS => StorageErrorKind::Unsupported,
        AUTH => StorageErrorKind::PermissionAuth,
        FORMAT => StorageErrorKind::FormatError,
        RANGE => StorageErrorKind::RangeError,
        NOTADB => StorageErrorKind::NotAStore,
        _ => StorageErrorKind::Unknown(code),
    }
}

/// Classify a `rusqlite` error, including the ones that carry no SQLite code.
pub fn classify(err: &rusqlite::Error) -> StorageErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => match translate(failure.extended_code) {
            // A failure reported with a success code is still a failure.
            StorageErrorKind::Success => StorageErrorKind::Unknown(failure.extended_code),
            kind => kind,
        },
        rusqlite::Error::QueryReturnedNoRows => StorageErrorKind::NotFound,
        rusqlite::Error::IntegralValueOutOfRange(..) => StorageErrorKind::RangeError,
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::Utf8Error(..) => StorageErrorKind::FormatError,
        rusqlite::Error::InvalidParameterCount(..)
        | rusqlite::Error::InvalidParameterName(..)
        | rusqlite::Error::InvalidColumnIndex(..)
        | rusqlite::Error::InvalidColumnName(..)
        | rusqlite::Error::ExecuteReturnedResults => StorageErrorKind::Misuse,
        _ => StorageErrorKind::Unknown(-1),
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage {
            kind: classify(&err),
            message: err.to_string(),
        }
    }
}
