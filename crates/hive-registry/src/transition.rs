//! Typed value transitions.
//!
//! A key's tag and its value rows change together:
//!
//! | stored | requested | steps |
//! |---|---|---|
//! | T (non-Void) | T | update the row in place |
//! | Void | Void | nothing |
//! | Void | T | insert row, retag T |
//! | T | U | delete T row, retag Void, insert U row (if any), retag U |
//!
//! Callers run [`apply`] inside one transaction, so a failure part way
//! through never leaves a tag without its row.

use tracing::{debug, warn};

use hive_store::NodeStore;
use hive_types::{KeyPath, KeyType, KeyValue, NodeId};

use crate::config::AncestorCreation;
use crate::error::{RegistryError, RegistryResult};
use crate::keys;
use crate::session::Registry;

/// The decoded tag of `id`.
pub(crate) fn current_type<S: NodeStore>(
    store: &S,
    id: NodeId,
    path: &KeyPath,
) -> RegistryResult<KeyType> {
    let record = store
        .node(id)?
        .ok_or_else(|| RegistryError::NotFound(path.to_string()))?;
    record.key_type().map_err(|_| {
        RegistryError::corrupt(path, format!("type tag {} out of range", record.tag))
    })
}

/// Move node `id` to `value`.
pub(crate) fn apply<S: NodeStore>(
    store: &mut S,
    id: NodeId,
    path: &KeyPath,
    value: &KeyValue,
) -> RegistryResult<()> {
    let current = current_type(store, id, path)?;
    let requested = value.key_type();

    if current == requested {
        if requested == KeyType::Void {
            return Ok(());
        }
        if !store.update_value(id, value)? {
            return Err(RegistryError::corrupt(
                path,
                format!("{current} key has no value row"),
            ));
        }
        debug!(key = %path, kind = %requested, "value updated");
        return Ok(());
    }

    if current != KeyType::Void {
        if !store.delete_value(id, current)? {
            warn!(key = %path, kind = %current, "stale value row already missing");
        }
        store.set_tag(id, KeyType::Void)?;
    }
    if requested != KeyType::Void {
        store.insert_value(id, value)?;
        store.set_tag(id, requested)?;
    }
    debug!(key = %path, from = %current, to = %requested, "key retyped");
    Ok(())
}

impl<S: NodeStore> Registry<S> {
    /// Make the key at `path` Void, creating it if needed.
    pub fn set_void(&mut self, path: &str) -> RegistryResult<()> {
        self.set(path, KeyValue::Void)
    }

    /// Store a 64-bit number at `path`, creating the key if needed.
    pub fn set_number(&mut self, path: &str, value: u64) -> RegistryResult<()> {
        self.set(path, KeyValue::Number(value))
    }

    /// Store text at `path`, creating the key if needed. The stored text ends
    /// at the first NUL character.
    pub fn set_string(&mut self, path: &str, value: &str) -> RegistryResult<()> {
        self.set(path, KeyValue::text(value))
    }

    /// Store bytes at `path`, creating the key if needed.
    pub fn set_raw(&mut self, path: &str, value: &[u8]) -> RegistryResult<()> {
        self.set(path, KeyValue::Raw(value.to_vec()))
    }

    /// Store any value at `path`, creating the key if needed.
    pub fn set(&mut self, path: &str, value: KeyValue) -> RegistryResult<()> {
        let path = KeyPath::parse(path)?;
        let value = match value {
            KeyValue::String(s) => KeyValue::text(&s),
            other => other,
        };
        match self.config.ancestor_creation {
            AncestorCreation::Atomic => self.mutate("set", |store| {
                let id = keys::ensure_key(store, &path)?;
                apply(store, id, &path, &value)
            }),
            AncestorCreation::Legacy => {
                let id = keys::ensure_key(&mut self.store, &path)?;
                self.mutate("set", |store| apply(store, id, &path, &value))
            }
        }
    }
}
