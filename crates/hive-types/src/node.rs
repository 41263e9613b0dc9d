use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeResult;
use crate::key::KeyType;

/// Identifier of a node in the key tree.
///
/// Ids are assigned by the storage backend when a node is created and are
/// never reused for a different node while the registry lives.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(i64);

impl NodeId {
    /// The fixed id of the root node (`/`).
    pub const ROOT: NodeId = NodeId(0);

    /// Wrap a raw backend row id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw backend row id.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns `true` if this is the root node.
    pub const fn is_root(self) -> bool {
        self.0 == Self::ROOT.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A row of the node directory.
///
/// The tag is kept raw so that a corrupt on-disk value can be carried up to
/// the layer that reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// `None` only for the root.
    pub parent: Option<NodeId>,
    pub name: String,
    pub tag: i64,
}

impl NodeRecord {
    /// Decode the stored type tag.
    pub fn key_type(&self) -> TypeResult<KeyType> {
        KeyType::from_tag(self.tag)
    }
}
