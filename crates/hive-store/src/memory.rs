//! In-memory node store for testing and ephemeral use.
//!
//! [`InMemoryNodeStore`] keeps the directory and value tables in ordered
//! maps. Unlike the SQLite backend it does not cascade deletes: a node can
//! only be removed once its children and value row are gone, the way a
//! foreign key without `ON DELETE CASCADE` behaves. It can also fail a chosen
//! mutation on purpose, which is how crash-consistency is exercised in tests.

use std::collections::BTreeMap;

use hive_types::{KeyType, KeyValue, NodeId, NodeRecord};

use crate::error::{StoreError, StoreResult};
use crate::schema::ROOT_NAME;
use crate::traits::{void_has_no_table, NodeStore};
use crate::translate::StorageErrorKind;

#[derive(Clone, Debug)]
struct Tables {
    nodes: BTreeMap<NodeId, NodeRecord>,
    numbers: BTreeMap<NodeId, u64>,
    strings: BTreeMap<NodeId, String>,
    raws: BTreeMap<NodeId, Vec<u8>>,
    next_id: i64,
}

impl Tables {
    fn empty() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            NodeId::ROOT,
            NodeRecord {
                id: NodeId::ROOT,
                parent: None,
                name: ROOT_NAME.to_string(),
                tag: KeyType::Void.tag(),
            },
        );
        Self {
            nodes,
            numbers: BTreeMap::new(),
            strings: BTreeMap::new(),
            raws: BTreeMap::new(),
            next_id: NodeId::ROOT.get() + 1,
        }
    }

    fn has_value(&self, id: NodeId, kind: KeyType) -> bool {
        match kind {
            KeyType::Number => self.numbers.contains_key(&id),
            KeyType::String => self.strings.contains_key(&id),
            KeyType::Raw => self.raws.contains_key(&id),
            KeyType::Void => false,
        }
    }
}

/// A scheduled failure: the mutation reached after `remaining` more
/// successful ones fails with `kind`.
#[derive(Clone, Copy, Debug)]
struct Fault {
    remaining: usize,
    kind: StorageErrorKind,
}

/// An in-memory implementation of [`NodeStore`].
#[derive(Debug)]
pub struct InMemoryNodeStore {
    tables: Tables,
    fault: Option<Fault>,
    mutations: usize,
}

impl InMemoryNodeStore {
    /// Create a store holding only the root.
    pub fn new() -> Self {
        Self {
            tables: Tables::empty(),
            fault: None,
            mutations: 0,
        }
    }

    /// Make the `n`th mutation from now (0 = the next one) fail with `kind`.
    /// The fault fires once.
    pub fn fail_after(&mut self, n: usize, kind: StorageErrorKind) {
        self.fault = Some(Fault { remaining: n, kind });
    }

    /// Drop a pending fault.
    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Number of mutations attempted so far, failed ones included.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Overwrite a node's raw tag, bypassing validation. Used to simulate
    /// on-disk corruption.
    pub fn corrupt_tag(&mut self, id: NodeId, tag: i64) -> StoreResult<()> {
        let node = self.tables.nodes.get_mut(&id).ok_or_else(|| missing_node(id))?;
        node.tag = tag;
        Ok(())
    }

    /// Count of rows across the three value tables.
    pub fn value_row_count(&self) -> usize {
        self.tables.numbers.len() + self.tables.strings.len() + self.tables.raws.len()
    }

    fn tick(&mut self) -> StoreResult<()> {
        self.mutations += 1;
        if let Some(fault) = self.fault.as_mut() {
            if fault.remaining == 0 {
                let kind = fault.kind;
                self.fault = None;
                return Err(StoreError::storage(kind, "injected fault"));
            }
            fault.remaining -= 1;
        }
        Ok(())
    }
}

impl Default for InMemoryNodeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn constraint(message: impl Into<String>) -> StoreError {
    StoreError::storage(StorageErrorKind::ConstraintViolation, message)
}

fn missing_node(id: NodeId) -> StoreError {
    constraint(format!("node {id} does not exist"))
}

impl NodeStore for InMemoryNodeStore {
    fn reset(&mut self) -> StoreResult<()> {
        self.tick()?;
        self.tables = Tables::empty();
        Ok(())
    }

    fn node(&self, id: NodeId) -> StoreResult<Option<NodeRecord>> {
        Ok(self.tables.nodes.get(&id).cloned())
    }

    fn child(&self, parent: NodeId, name: &str) -> StoreResult<Option<NodeId>> {
        Ok(self
            .tables
            .nodes
            .values()
            .find(|n| n.parent == Some(parent) && n.name == name)
            .map(|n| n.id))
    }

    fn children(&self, parent: NodeId) -> StoreResult<Vec<NodeRecord>> {
        let mut children: Vec<NodeRecord> = self
            .tables
            .nodes
            .values()
            .filter(|n| n.parent == Some(parent))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        Ok(self.tables.nodes.values().cloned().collect())
    }

    fn insert_node(&mut self, parent: NodeId, name: &str) -> StoreResult<NodeId> {
        self.tick()?;
        if !self.tables.nodes.contains_key(&parent) {
            return Err(missing_node(parent));
        }
        if self.child(parent, name)?.is_some() {
            return Err(constraint(format!("{name:?} already exists under {parent}")));
        }
        let id = NodeId::new(self.tables.next_id);
        self.tables.next_id += 1;
        self.tables.nodes.insert(
            id,
            NodeRecord {
                id,
                parent: Some(parent),
                name: name.to_string(),
                tag: KeyType::Void.tag(),
            },
        );
        Ok(id)
    }

    fn delete_node(&mut self, id: NodeId) -> StoreResult<bool> {
        self.tick()?;
        if id.is_root() {
            return Err(StoreError::storage(
                StorageErrorKind::Misuse,
                "the root node cannot be deleted",
            ));
        }
        if self.tables.nodes.values().any(|n| n.parent == Some(id)) {
            return Err(constraint(format!("node {id} still has children")));
        }
        if KeyType::STORED
            .into_iter()
            .any(|kind| self.tables.has_value(id, kind))
        {
            return Err(constraint(format!("node {id} still has a value row")));
        }
        Ok(self.tables.nodes.remove(&id).is_some())
    }

    fn set_tag(&mut self, id: NodeId, kind: KeyType) -> StoreResult<()> {
        self.tick()?;
        if let Some(node) = self.tables.nodes.get_mut(&id) {
            node.tag = kind.tag();
        }
        Ok(())
    }

    fn read_value(&self, id: NodeId, kind: KeyType) -> StoreResult<Option<KeyValue>> {
        let value = match kind {
            KeyType::Number => self.tables.numbers.get(&id).map(|n| KeyValue::Number(*n)),
            KeyType::String => self.tables.strings.get(&id).cloned().map(KeyValue::String),
            KeyType::Raw => self.tables.raws.get(&id).cloned().map(KeyValue::Raw),
            KeyType::Void => return Err(void_has_no_table()),
        };
        Ok(value)
    }

    fn insert_value(&mut self, id: NodeId, value: &KeyValue) -> StoreResult<()> {
        self.tick()?;
        if !self.tables.nodes.contains_key(&id) {
            return Err(missing_node(id));
        }
        let kind = value.key_type();
        if self.tables.has_value(id, kind) {
            return Err(constraint(format!("node {id} already has a {kind} row")));
        }
        match value {
            KeyValue::Number(n) => {
                self.tables.numbers.insert(id, *n);
            }
            KeyValue::String(s) => {
                self.tables.strings.insert(id, s.clone());
            }
            KeyValue::Raw(bytes) => {
                self.tables.raws.insert(id, bytes.clone());
            }
            KeyValue::Void => return Err(void_has_no_table()),
        }
        Ok(())
    }

    fn update_value(&mut self, id: NodeId, value: &KeyValue) -> StoreResult<bool> {
        self.tick()?;
        let updated = match value {
            KeyValue::Number(n) => self.tables.numbers.get_mut(&id).map(|slot| *slot = *n),
            KeyValue::String(s) => self.tables.strings.get_mut(&id).map(|slot| *slot = s.clone()),
            KeyValue::Raw(bytes) => self.tables.raws.get_mut(&id).map(|slot| *slot = bytes.clone()),
            KeyValue::Void => return Err(void_has_no_table()),
        };
        Ok(updated.is_some())
    }

    fn delete_value(&mut self, id: NodeId, kind: KeyType) -> StoreResult<bool> {
        self.tick()?;
        let removed = match kind {
            KeyType::Number => self.tables.numbers.remove(&id).is_some(),
            KeyType::String => self.tables.strings.remove(&id).is_some(),
            KeyType::Raw => self.tables.raws.remove(&id).is_some(),
            KeyType::Void => return Err(void_has_no_table()),
        };
        Ok(removed)
    }

    fn value_tables(&self, id: NodeId) -> StoreResult<Vec<KeyType>> {
        Ok(KeyType::STORED
            .into_iter()
            .filter(|kind| self.tables.has_value(id, *kind))
            .collect())
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let snapshot = self.tables.clone();
        let result = f(self);
        if result.is_err() {
            self.tables = snapshot;
        }
        result
    }
}
