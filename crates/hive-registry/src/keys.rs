//! Key creation and subtree deletion.

use tracing::debug;

use hive_store::NodeStore;
use hive_types::{KeyPath, NodeId};

use crate::config::AncestorCreation;
use crate::error::{RegistryError, RegistryResult};
use crate::resolver::{self, Walk};
use crate::session::Registry;

/// Create the segments of `path` that `walk` did not reach, top-down.
pub(crate) fn create_missing<S: NodeStore>(
    store: &mut S,
    path: &KeyPath,
    walk: Walk,
) -> RegistryResult<NodeId> {
    let mut node = walk.node;
    for (depth, segment) in path.segments().iter().enumerate().skip(walk.matched) {
        node = store.insert_node(node, segment)?;
        debug!(key = %fmt_prefix(path, depth + 1), id = %node, "key created");
    }
    Ok(node)
}

/// The node at `path`, creating it and any missing ancestors.
pub(crate) fn ensure_key<S: NodeStore>(store: &mut S, path: &KeyPath) -> RegistryResult<NodeId> {
    let walk = resolver::walk(store, path)?;
    if walk.is_complete(path) {
        return Ok(walk.node);
    }
    create_missing(store, path, walk)
}

/// Delete `id`, its descendants and all of their values, deepest first.
/// Returns the number of nodes removed.
///
/// Rows are removed one by one rather than through a backend cascade, so the
/// depth of the subtree is not bounded by the backend's recursion limit.
pub(crate) fn delete_subtree<S: NodeStore>(store: &mut S, id: NodeId) -> RegistryResult<usize> {
    // Breadth-first, so every parent precedes its children.
    let mut order = vec![id];
    let mut next = 0;
    while next < order.len() {
        order.extend(store.children(order[next])?.into_iter().map(|c| c.id));
        next += 1;
    }

    for node in order.iter().rev() {
        for kind in store.value_tables(*node)? {
            store.delete_value(*node, kind)?;
        }
        store.delete_node(*node)?;
    }
    Ok(order.len())
}

fn fmt_prefix(path: &KeyPath, depth: usize) -> String {
    path.ancestor(depth)
        .map(|p| p.to_string())
        .unwrap_or_else(|| path.to_string())
}

impl<S: NodeStore> Registry<S> {
    /// Create the key at `path`, together with any missing ancestors.
    ///
    /// Fails with `AlreadyExists` if the key is already present. New keys are
    /// Void.
    pub fn add_key(&mut self, path: &str) -> RegistryResult<NodeId> {
        let path = KeyPath::parse(path)?;
        let create = |store: &mut S| -> RegistryResult<NodeId> {
            let walk = resolver::walk(store, &path)?;
            if walk.is_complete(&path) {
                return Err(RegistryError::AlreadyExists(path.to_string()));
            }
            create_missing(store, &path, walk)
        };
        match self.config.ancestor_creation {
            AncestorCreation::Atomic => self.mutate("add_key", create),
            AncestorCreation::Legacy => create(&mut self.store),
        }
    }

    /// Delete the key at `path` with its whole subtree.
    pub fn del_key(&mut self, path: &str) -> RegistryResult<()> {
        let path = KeyPath::parse(path)?;
        let removed = self.mutate("del_key", |store| {
            let id = resolver::resolve(store, &path)?;
            delete_subtree(store, id)
        })?;
        debug!(key = %path, removed, "key deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::testing;
    use hive_store::{InMemoryNodeStore, SqliteNodeStore, SqliteOptions, StorageErrorKind};
    use hive_types::KeyType;

    #[test]
    fn added_key_is_void() {
        let mut reg = testing::sqlite();
        reg.add_key("/a").unwrap();
        let pair = reg.get_key_pair("/a").unwrap();
        assert_eq!(pair.key_type(), KeyType::Void);
        assert_eq!(pair.name(), "/a");
    }

    #[test]
    fn add_creates_ancestors() {
        let mut reg = testing::memory();
        reg.add_key("/x/y/z").unwrap();
        for p in ["/x", "/x/y", "/x/y/z"] {
            assert_eq!(reg.key_type(p).unwrap(), KeyType::Void, "{p}");
        }
        assert_eq!(reg.list(Some("/x")).unwrap(), vec!["y"]);
    }

    #[test]
    fn duplicate_add_fails() {
        let mut reg = testing::sqlite();
        reg.add_key("/dup").unwrap();
        let err = reg.add_key("dup/").unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(p) if p == "/dup"));
    }

    #[test]
    fn add_under_existing_prefix() {
        let mut reg = testing::sqlite();
        let a = reg.add_key("/a").unwrap();
        reg.add_key("/a/b/c").unwrap();
        assert_eq!(reg.resolve("/a").unwrap(), a);
        assert_eq!(reg.store().nodes().unwrap().len(), 4);
    }

    #[test]
    fn add_rejects_bad_paths() {
        let mut reg = testing::memory();
        for bad in ["", "/", "/a/\0b"] {
            assert!(matches!(
                reg.add_key(bad).unwrap_err(),
                RegistryError::InvalidPath { .. }
            ));
        }
    }

    #[test]
    fn delete_removes_subtree_on_sqlite() {
        let mut reg = testing::sqlite();
        reg.set_number("/a/b/n", 1).unwrap();
        reg.set_string("/a/s", "x").unwrap();
        reg.add_key("/keep").unwrap();

        reg.del_key("/a").unwrap();
        for p in ["/a", "/a/b", "/a/b/n", "/a/s"] {
            assert!(reg.get_key_pair(p).unwrap_err().is_not_found(), "{p}");
        }
        assert_eq!(reg.list(None).unwrap(), vec!["keep"]);
        assert!(reg.verify().unwrap().is_clean());
    }

    #[test]
    fn delete_without_cascade_removes_everything() {
        let mut reg = testing::memory();
        reg.set_number("/a/b/n", 1).unwrap();
        reg.set_raw("/a/b/r", b"raw").unwrap();
        reg.set_string("/a", "top").unwrap();
        reg.set_number("/other", 9).unwrap();

        reg.del_key("/a").unwrap();
        assert_eq!(reg.store().value_row_count(), 1);
        assert_eq!(reg.store().nodes().unwrap().len(), 2);
        assert_eq!(reg.get_key_pair("/other").unwrap().as_number(), Some(9));
    }

    #[test]
    fn delete_on_sqlite_without_foreign_keys() {
        let options = SqliteOptions {
            foreign_keys: false,
            ..SqliteOptions::default()
        };
        let store = SqliteNodeStore::open_in_memory(options).unwrap();
        let mut reg = Registry::with_store(store, RegistryConfig::default());

        reg.set_raw("/a/b/c", &[0, 1]).unwrap();
        reg.del_key("/a").unwrap();
        assert_eq!(reg.store().nodes().unwrap().len(), 1);
        assert!(reg.verify().unwrap().is_clean());
    }

    #[test]
    fn delete_deeper_than_backend_recursion_limit() {
        let mut reg = testing::sqlite();
        let deep: String = (0..1100).map(|i| format!("/s{i}")).collect();
        reg.set_number(&deep, 1).unwrap();
        reg.add_key("/s0/side").unwrap();

        reg.del_key("/s0").unwrap();
        assert!(!reg.exists("/s0").unwrap());
        assert_eq!(reg.store().nodes().unwrap().len(), 1);
        assert!(reg.verify().unwrap().is_clean());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let mut reg = testing::sqlite();
        assert!(reg.del_key("/nope").unwrap_err().is_not_found());
    }

    #[test]
    fn delete_then_recreate() {
        let mut reg = testing::sqlite();
        reg.set_number("/a/b", 5).unwrap();
        reg.del_key("/a").unwrap();
        reg.add_key("/a/b").unwrap();
        assert_eq!(reg.key_type("/a/b").unwrap(), KeyType::Void);
    }

    #[test]
    fn atomic_creation_rolls_back_ancestors() {
        let mut reg = testing::memory();
        // Third insert fails: /p and /p/q are created, /p/q/r is not.
        reg.store_mut().fail_after(2, StorageErrorKind::NoSpace);
        let err = reg.add_key("/p/q/r").unwrap_err();
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::NoSpace));
        assert!(!reg.exists("/p").unwrap());
        assert_eq!(reg.store().nodes().unwrap().len(), 1);
    }

    #[test]
    fn legacy_creation_keeps_ancestors() {
        let config = RegistryConfig {
            ancestor_creation: AncestorCreation::Legacy,
            ..RegistryConfig::default()
        };
        let mut reg = Registry::with_store(InMemoryNodeStore::new(), config);
        reg.store_mut().fail_after(2, StorageErrorKind::NoSpace);
        reg.add_key("/p/q/r").unwrap_err();
        assert!(reg.exists("/p/q").unwrap());
        assert!(!reg.exists("/p/q/r").unwrap());

        reg.add_key("/p/q/r").unwrap();
        assert!(reg.exists("/p/q/r").unwrap());
    }

    #[test]
    fn failed_delete_leaves_tree_intact() {
        let mut reg = testing::memory();
        reg.set_number("/a/b", 1).unwrap();
        reg.set_number("/a/c", 2).unwrap();
        // Value of /a/c and node /a/c go first; the next mutation fails.
        reg.store_mut().fail_after(2, StorageErrorKind::Io);
        reg.del_key("/a").unwrap_err();

        assert_eq!(reg.get_key_pair("/a/b").unwrap().as_number(), Some(1));
        assert_eq!(reg.get_key_pair("/a/c").unwrap().as_number(), Some(2));
        assert!(reg.verify().unwrap().is_clean());
    }
}
