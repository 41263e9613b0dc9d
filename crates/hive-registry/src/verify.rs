//! Whole-registry consistency check.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use hive_store::NodeStore;
use hive_types::{KeyType, NodeId};

use crate::error::RegistryResult;
use crate::session::Registry;

/// Result of [`Registry::verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Nodes examined, root included.
    pub node_count: usize,
    /// Value rows found across all tables.
    pub value_count: usize,
    pub violations: Vec<Violation>,
}

impl ConsistencyReport {
    /// Returns `true` if no violation was found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// One inconsistency found by [`Registry::verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub node: NodeId,
    pub name: String,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The stored tag is not a known key type.
    UnknownTag,
    /// The tag names a value table that has no row for the node.
    MissingValue,
    /// A value table holds a row the tag does not name.
    StrayValue,
    /// The node's parent does not exist.
    Orphan,
}

impl<S: NodeStore> Registry<S> {
    /// Scan every node and report tag, value-row and parent inconsistencies.
    pub fn verify(&self) -> RegistryResult<ConsistencyReport> {
        let nodes = self.store.nodes()?;
        let ids: BTreeSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        let mut violations = Vec::new();
        let mut value_count = 0;

        for record in &nodes {
            let mut flag = |kind, description: String| {
                violations.push(Violation {
                    node: record.id,
                    name: record.name.clone(),
                    kind,
                    description,
                })
            };

            if let Some(parent) = record.parent {
                if !ids.contains(&parent) {
                    flag(ViolationKind::Orphan, format!("parent {parent} does not exist"));
                }
            }

            let tables = self.store.value_tables(record.id)?;
            value_count += tables.len();

            let expected = match record.key_type() {
                Ok(kind) => kind,
                Err(_) => {
                    flag(
                        ViolationKind::UnknownTag,
                        format!("type tag {} out of range", record.tag),
                    );
                    continue;
                }
            };
            if expected != KeyType::Void && !tables.contains(&expected) {
                flag(
                    ViolationKind::MissingValue,
                    format!("{expected} key has no {expected} row"),
                );
            }
            for table in tables.into_iter().filter(|t| *t != expected) {
                flag(
                    ViolationKind::StrayValue,
                    format!("{expected} key has a row in the {table} table"),
                );
            }
        }

        let report = ConsistencyReport {
            node_count: nodes.len(),
            value_count,
            violations,
        };
        if report.is_clean() {
            info!(nodes = report.node_count, values = report.value_count, "registry verified");
        } else {
            warn!(violations = report.violations.len(), "registry inconsistent");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::testing;
    use hive_store::{InMemoryNodeStore, SqliteNodeStore, SqliteOptions, StorageErrorKind};
    use hive_types::KeyValue;
    use proptest::prelude::*;

    #[test]
    fn fresh_registry_is_clean() {
        let report = testing::sqlite().verify().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.node_count, 1);
        assert_eq!(report.value_count, 0);
    }

    #[test]
    fn populated_registry_is_clean() {
        let mut reg = testing::sqlite();
        reg.set_number("/a/n", 1).unwrap();
        reg.set_string("/a/s", "s").unwrap();
        reg.set_raw("/b", &[9]).unwrap();
        let report = reg.verify().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.node_count, 5);
        assert_eq!(report.value_count, 3);
    }

    #[test]
    fn reports_unknown_tag() {
        let mut reg = testing::memory();
        let id = reg.add_key("/k").unwrap();
        reg.store_mut().corrupt_tag(id, -1).unwrap();
        let report = reg.verify().unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::UnknownTag);
        assert_eq!(report.violations[0].node, id);
    }

    #[test]
    fn reports_missing_and_stray_rows() {
        let mut reg = testing::sqlite();
        reg.set_number("/n", 1).unwrap();
        let n = reg.resolve("/n").unwrap();
        reg.store_mut().delete_value(n, KeyType::Number).unwrap();
        let v = reg.add_key("/v").unwrap();
        reg.store_mut().insert_value(v, &KeyValue::Raw(vec![1])).unwrap();

        let kinds: Vec<_> = reg.verify().unwrap().violations.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::MissingValue, ViolationKind::StrayValue]);
    }

    #[test]
    fn reports_orphans() {
        let options = SqliteOptions {
            foreign_keys: false,
            ..SqliteOptions::default()
        };
        let mut store = SqliteNodeStore::open_in_memory(options).unwrap();
        let a = store.insert_node(NodeId::ROOT, "a").unwrap();
        store.insert_node(a, "b").unwrap();
        store.delete_node(a).unwrap();

        let reg = Registry::with_store(store, RegistryConfig::default());
        let report = reg.verify().unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].kind, ViolationKind::Orphan);
        assert_eq!(report.violations[0].name, "b");
    }

    #[derive(Clone, Debug)]
    enum Op {
        Add(String),
        Del(String),
        Set(String, KeyValue),
    }

    fn key_path() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 1..4)
            .prop_map(|segments| format!("/{}", segments.join("/")))
    }

    fn key_value() -> impl Strategy<Value = KeyValue> {
        prop_oneof![
            Just(KeyValue::Void),
            any::<u64>().prop_map(KeyValue::Number),
            "[a-z\\x00]{0,6}".prop_map(|s| KeyValue::text(&s)),
            prop::collection::vec(any::<u8>(), 0..6).prop_map(KeyValue::Raw),
        ]
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            key_path().prop_map(Op::Add),
            key_path().prop_map(Op::Del),
            (key_path(), key_value()).prop_map(|(p, v)| Op::Set(p, v)),
        ]
    }

    fn snapshot(reg: &Registry<InMemoryNodeStore>) -> Vec<(String, KeyValue)> {
        let mut out = Vec::new();
        let mut pending = vec![(NodeId::ROOT, String::new())];
        while let Some((id, prefix)) = pending.pop() {
            for child in reg.store().children(id).unwrap() {
                let path = format!("{prefix}/{}", child.name);
                let (_, value) = reg.get_key_pair(&path).unwrap().into_parts();
                out.push((path.clone(), value));
                pending.push((child.id, path));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn faults_never_break_consistency(
            ops in prop::collection::vec((op(), prop::option::of(0usize..6)), 1..24)
        ) {
            let mut reg = Registry::with_store(InMemoryNodeStore::new(), RegistryConfig::default());
            for (op, fault) in ops {
                if let Some(n) = fault {
                    reg.store_mut().fail_after(n, StorageErrorKind::Io);
                }
                let before = snapshot(&reg);
                let result = match &op {
                    Op::Add(p) => reg.add_key(p).map(|_| ()),
                    Op::Del(p) => reg.del_key(p),
                    Op::Set(p, v) => reg.set(p, v.clone()),
                };
                reg.store_mut().clear_fault();

                prop_assert!(reg.verify().unwrap().is_clean(), "after {:?}", op);
                if result.is_err() {
                    prop_assert_eq!(snapshot(&reg), before, "failed {:?} changed state", op);
                }
            }
        }
    }
}
