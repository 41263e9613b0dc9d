use hive_types::{KeyType, KeyValue, NodeId, NodeRecord};

use crate::error::{StoreError, StoreResult};

/// Persistent node directory plus the three value tables.
///
/// All implementations must satisfy these invariants:
/// - The root node (`NodeId::ROOT`, name `/`, no parent) exists after
///   construction and after [`reset`](NodeStore::reset), and cannot be deleted.
/// - `(parent, name)` is unique in the directory.
/// - Each value table holds at most one row per node id.
/// - Failures are returned as translated [`StoreError`]s.
///
/// The store does not enforce the type-consistency invariant between a node's
/// tag and its value rows; that is the registry engine's job. Nor does it
/// remove subtrees: callers delete values and children before parents.
pub trait NodeStore {
    /// Destroy all keys and recreate an empty namespace holding only the root.
    fn reset(&mut self) -> StoreResult<()>;

    /// Read a node by id. Returns `Ok(None)` if it does not exist.
    fn node(&self, id: NodeId) -> StoreResult<Option<NodeRecord>>;

    /// Find the child of `parent` called `name`.
    fn child(&self, parent: NodeId, name: &str) -> StoreResult<Option<NodeId>>;

    /// All direct children of `parent`, sorted by name.
    fn children(&self, parent: NodeId) -> StoreResult<Vec<NodeRecord>>;

    /// Every node in the directory, root included, sorted by id.
    fn nodes(&self) -> StoreResult<Vec<NodeRecord>>;

    /// Create a Void node under `parent` and return its new id.
    fn insert_node(&mut self, parent: NodeId, name: &str) -> StoreResult<NodeId>;

    /// Delete a node row. Returns `true` if it existed.
    fn delete_node(&mut self, id: NodeId) -> StoreResult<bool>;

    /// Overwrite a node's type tag.
    fn set_tag(&mut self, id: NodeId, kind: KeyType) -> StoreResult<()>;

    /// Read the row for `id` from the table of `kind`.
    fn read_value(&self, id: NodeId, kind: KeyType) -> StoreResult<Option<KeyValue>>;

    /// Insert a row for `id` into the table matching the value's kind.
    fn insert_value(&mut self, id: NodeId, value: &KeyValue) -> StoreResult<()>;

    /// Replace the payload of an existing row. Returns `false` if there was
    /// no row to update.
    fn update_value(&mut self, id: NodeId, value: &KeyValue) -> StoreResult<bool>;

    /// Delete the row for `id` from the table of `kind`. Returns `true` if a
    /// row existed.
    fn delete_value(&mut self, id: NodeId, kind: KeyType) -> StoreResult<bool>;

    /// Which value tables currently hold a row for `id`.
    fn value_tables(&self, id: NodeId) -> StoreResult<Vec<KeyType>>;

    /// Release the backend. The default just drops it.
    fn close(self) -> StoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// Run `f` as one atomic unit: if it returns `Err`, every change it made
    /// is undone. Calls may nest.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>;
}

/// Error for operations that would need a value table for `Void`.
pub(crate) fn void_has_no_table() -> StoreError {
    StoreError::storage(
        crate::translate::StorageErrorKind::Misuse,
        "void keys have no value table",
    )
}
