//! Foundation types for the Hive registry.
//!
//! Hive is a persistent, hierarchical, typed key-value registry. Every other
//! Hive crate depends on `hive-types`.
//!
//! # Key Types
//!
//! - [`NodeId`] -- Backend-assigned identifier of a node in the key tree
//! - [`KeyType`] -- The four value kinds a key can hold (Void, Number, String, Raw)
//! - [`KeyValue`] -- A typed payload
//! - [`KeyPair`] -- An owned snapshot of a key returned by retrieval
//! - [`KeyPath`] -- A parsed, slash-delimited key path

pub mod error;
pub mod key;
pub mod node;
pub mod path;

pub use error::{TypeError, TypeResult};
pub use key::{KeyPair, KeyType, KeyValue};
pub use node::{NodeId, NodeRecord};
pub use path::KeyPath;
