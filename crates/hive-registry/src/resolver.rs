//! Path resolution against the node directory.

use hive_store::NodeStore;
use hive_types::{KeyPath, NodeId};

use crate::error::{RegistryError, RegistryResult};
use crate::session::Registry;

/// How far a path reaches into the existing tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walk {
    /// Deepest existing node on the path (the root if nothing matched).
    pub node: NodeId,
    /// Number of leading segments that exist.
    pub matched: usize,
}

impl Walk {
    pub fn is_complete(&self, path: &KeyPath) -> bool {
        self.matched == path.len()
    }
}

/// Follow `path` from the root until the first segment that does not exist.
pub fn walk<S: NodeStore>(store: &S, path: &KeyPath) -> RegistryResult<Walk> {
    let mut node = NodeId::ROOT;
    let mut matched = 0;
    for segment in path.segments() {
        match store.child(node, segment)? {
            Some(id) => {
                node = id;
                matched += 1;
            }
            None => break,
        }
    }
    Ok(Walk { node, matched })
}

/// The node at `path`, or `NotFound` at the first missing segment.
pub fn resolve<S: NodeStore>(store: &S, path: &KeyPath) -> RegistryResult<NodeId> {
    let walk = walk(store, path)?;
    if walk.is_complete(path) {
        Ok(walk.node)
    } else {
        Err(RegistryError::NotFound(path.to_string()))
    }
}

impl<S: NodeStore> Registry<S> {
    /// The node id behind `path`.
    pub fn resolve(&self, path: &str) -> RegistryResult<NodeId> {
        let path = KeyPath::parse(path)?;
        resolve(&self.store, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn walk_stops_at_first_miss() {
        let mut reg = testing::sqlite();
        reg.add_key("/a/b").unwrap();
        let a = reg.resolve("/a").unwrap();

        let path = KeyPath::parse("/a/x/b").unwrap();
        let w = walk(reg.store(), &path).unwrap();
        assert_eq!(w, Walk { node: a, matched: 1 });
        assert!(!w.is_complete(&path));
    }

    #[test]
    fn walk_of_fresh_tree_is_root() {
        let reg = testing::memory();
        let path = KeyPath::parse("/a/b").unwrap();
        assert_eq!(
            walk(reg.store(), &path).unwrap(),
            Walk { node: NodeId::ROOT, matched: 0 }
        );
    }

    #[test]
    fn resolve_ignores_redundant_separators() {
        let mut reg = testing::memory();
        let id = reg.add_key("/a/b").unwrap();
        assert_eq!(reg.resolve("//a///b/").unwrap(), id);
        assert_eq!(reg.resolve("a/b").unwrap(), id);
    }

    #[test]
    fn resolve_missing_is_not_found() {
        let mut reg = testing::sqlite();
        reg.add_key("/a").unwrap();
        let err = reg.resolve("/a/b/c").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(p) if p == "/a/b/c"));
    }

    #[test]
    fn resolve_rejects_root_and_empty() {
        let reg = testing::memory();
        for bad in ["", "/", "///"] {
            assert!(matches!(
                reg.resolve(bad).unwrap_err(),
                RegistryError::InvalidPath { .. }
            ));
        }
    }

    #[test]
    fn siblings_with_same_name_under_different_parents() {
        let mut reg = testing::sqlite();
        let x = reg.add_key("/a/leaf").unwrap();
        let y = reg.add_key("/b/leaf").unwrap();
        assert_ne!(x, y);
        assert_eq!(reg.resolve("/b/leaf").unwrap(), y);
    }
}
