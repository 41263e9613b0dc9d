use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// The kind of value a key currently holds.
///
/// The discriminants are the tags persisted in the node directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyType {
    /// No value.
    Void = 0,
    /// 64-bit integer; signedness is tracked by the caller.
    Number = 1,
    /// Text.
    String = 2,
    /// Opaque bytes.
    Raw = 3,
}

impl KeyType {
    /// The key types that keep their payload in a value table.
    pub const STORED: [KeyType; 3] = [KeyType::Number, KeyType::String, KeyType::Raw];

    /// The persisted tag.
    pub const fn tag(self) -> i64 {
        self as i64
    }

    /// Decode a persisted tag.
    pub fn from_tag(tag: i64) -> TypeResult<Self> {
        match tag {
            0 => Ok(KeyType::Void),
            1 => Ok(KeyType::Number),
            2 => Ok(KeyType::String),
            3 => Ok(KeyType::Raw),
            other => Err(TypeError::UnknownTag(other)),
        }
    }

    /// Lowercase name used in logs and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            KeyType::Void => "void",
            KeyType::Number => "number",
            KeyType::String => "string",
            KeyType::Raw => "raw",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyValue {
    Void,
    Number(u64),
    String(String),
    Raw(Vec<u8>),
}

impl KeyValue {
    /// Build a string value with the registry's text semantics: the stored
    /// text ends at the first NUL character, if any.
    pub fn text(value: &str) -> Self {
        let end = value.find('\0').unwrap_or(value.len());
        KeyValue::String(value[..end].to_string())
    }

    /// The kind of this value.
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyValue::Void => KeyType::Void,
            KeyValue::Number(_) => KeyType::Number,
            KeyValue::String(_) => KeyType::String,
            KeyValue::Raw(_) => KeyType::Raw,
        }
    }

    /// Payload size in bytes: 8 for numbers, text length plus a NUL
    /// terminator for strings, blob length for raw.
    pub fn payload_len(&self) -> usize {
        match self {
            KeyValue::Void => 0,
            KeyValue::Number(_) => std::mem::size_of::<u64>(),
            KeyValue::String(s) => s.len() + 1,
            KeyValue::Raw(bytes) => bytes.len(),
        }
    }
}

/// An owned snapshot of a key, as returned by retrieval.
///
/// The payload is a copy: it shares nothing with the registry and is released
/// when the `KeyPair` is dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    name: String,
    value: KeyValue,
}

impl KeyPair {
    pub fn new(name: impl Into<String>, value: KeyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// The canonical path of the key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_type(&self) -> KeyType {
        self.value.key_type()
    }

    pub fn value(&self) -> &KeyValue {
        &self.value
    }

    pub fn as_number(&self) -> Option<u64> {
        match self.value {
            KeyValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            KeyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            KeyValue::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Take ownership of the name and payload.
    pub fn into_parts(self) -> (String, KeyValue) {
        (self.name, self.value)
    }
}
