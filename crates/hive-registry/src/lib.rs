//! The Hive registry engine.
//!
//! A [`Registry`] is a persistent tree of named keys. Each key holds one typed
//! value (Void, Number, String or Raw) and may have children. Paths are
//! slash-delimited (`/net/eth0/mtu`); missing ancestors are created on demand.
//!
//! # Operations
//!
//! - Sessions: [`Registry::open`], [`Registry::close`], [`Registry::initialize`]
//! - Keys: [`Registry::add_key`], [`Registry::del_key`]
//! - Values: [`Registry::set_void`], [`Registry::set_number`],
//!   [`Registry::set_string`], [`Registry::set_raw`]
//! - Reads: [`Registry::get_key_pair`], [`Registry::key_type`],
//!   [`Registry::exists`], [`Registry::list`]
//! - Checks: [`Registry::verify`]
//!
//! Every mutation runs as a single backend transaction.

pub mod config;
pub mod error;
pub mod keys;
pub mod resolver;
pub mod retrieval;
pub mod session;
pub mod transition;
pub mod verify;

pub use config::{AncestorCreation, RegistryConfig};
pub use error::{RegistryError, RegistryResult};
pub use resolver::Walk;
pub use session::Registry;
pub use verify::{ConsistencyReport, Violation, ViolationKind};

pub use hive_store::{InMemoryNodeStore, NodeStore, SqliteNodeStore, StorageErrorKind};
pub use hive_types::{KeyPair, KeyType, KeyValue, NodeId};
