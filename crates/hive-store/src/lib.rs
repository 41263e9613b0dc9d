//! Storage backends for the Hive registry.
//!
//! The registry engine keeps its tree in a node directory plus three value
//! tables (number, string, raw). This crate defines the backend interface and
//! ships two implementations.
//!
//! # Storage Backends
//!
//! All backends implement the [`NodeStore`] trait:
//!
//! - [`SqliteNodeStore`] -- durable store on an SQLite file, cascading deletes
//!   through foreign keys
//! - [`InMemoryNodeStore`] -- map-based store for tests and embedding; it does
//!   not cascade and supports fault injection
//!
//! # Design Rules
//!
//! 1. The store performs single-row operations; tree semantics live in the
//!    registry engine.
//! 2. Every backend failure is translated into a [`StorageErrorKind`] before it
//!    leaves this crate (see [`translate`]).
//! 3. Multi-step mutations run through [`NodeStore::atomically`] and either
//!    apply completely or not at all.

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod translate;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryNodeStore;
pub use sqlite::{JournalMode, SqliteNodeStore, SqliteOptions};
pub use traits::NodeStore;
pub use translate::{translate, StorageErrorKind};
