use hive_store::NodeStore;
use hive_types::{KeyPair, KeyPath, KeyType, KeyValue, NodeId};

use crate::error::{RegistryError, RegistryResult};
use crate::resolver;
use crate::session::Registry;
use crate::transition::current_type;

impl<S: NodeStore> Registry<S> {
    /// An owned snapshot of the key at `path`.
    pub fn get_key_pair(&self, path: &str) -> RegistryResult<KeyPair> {
        let path = KeyPath::parse(path)?;
        let id = resolver::resolve(&self.store, &path)?;
        let value = match current_type(&self.store, id, &path)? {
            KeyType::Void => KeyValue::Void,
            kind => self.store.read_value(id, kind)?.ok_or_else(|| {
                RegistryError::corrupt(&path, format!("{kind} key has no value row"))
            })?,
        };
        Ok(KeyPair::new(path.to_string(), value))
    }

    /// The type of the key at `path`, without reading its value.
    pub fn key_type(&self, path: &str) -> RegistryResult<KeyType> {
        let path = KeyPath::parse(path)?;
        let id = resolver::resolve(&self.store, &path)?;
        current_type(&self.store, id, &path)
    }

    pub fn exists(&self, path: &str) -> RegistryResult<bool> {
        match self.resolve(path) {
            Ok(_) => Ok(true),
            Err(RegistryError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Names of the children of `path`, sorted. `None` lists the top level.
    pub fn list(&self, path: Option<&str>) -> RegistryResult<Vec<String>> {
        let parent = match path {
            Some(path) => self.resolve(path)?,
            None => NodeId::ROOT,
        };
        let children = self.store.children(parent)?;
        Ok(children.into_iter().map(|c| c.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn pair_carries_canonical_name() {
        let mut reg = testing::sqlite();
        reg.set_string("a//b/", "v").unwrap();
        let pair = reg.get_key_pair("a/b").unwrap();
        assert_eq!(pair.name(), "/a/b");

        let (name, value) = pair.into_parts();
        assert_eq!(name, "/a/b");
        assert_eq!(value, KeyValue::String("v".into()));
    }

    #[test]
    fn pair_is_independent_of_later_writes() {
        let mut reg = testing::memory();
        reg.set_number("/n", 1).unwrap();
        let pair = reg.get_key_pair("/n").unwrap();
        reg.set_number("/n", 2).unwrap();
        reg.del_key("/n").unwrap();
        assert_eq!(pair.as_number(), Some(1));
    }

    #[test]
    fn missing_key_is_not_found() {
        let reg = testing::sqlite();
        let err = reg.get_key_pair("/ghost").unwrap_err();
        assert!(err.is_not_found());
        assert!(!reg.exists("/ghost").unwrap());
    }

    #[test]
    fn out_of_range_tag_is_corrupt_not_missing() {
        let mut reg = testing::memory();
        let id = reg.add_key("/k").unwrap();
        reg.store_mut().corrupt_tag(id, 17).unwrap();

        let err = reg.get_key_pair("/k").unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { ref reason, .. } if reason.contains("17")));
        assert!(matches!(reg.key_type("/k"), Err(RegistryError::Corrupt { .. })));
        assert!(reg.exists("/k").unwrap());
    }

    #[test]
    fn missing_value_row_is_corrupt() {
        let mut reg = testing::sqlite();
        reg.set_raw("/r", b"x").unwrap();
        let id = reg.resolve("/r").unwrap();
        reg.store_mut().delete_value(id, KeyType::Raw).unwrap();
        assert!(matches!(
            reg.get_key_pair("/r").unwrap_err(),
            RegistryError::Corrupt { .. }
        ));
    }

    #[test]
    fn exists_propagates_bad_paths() {
        let reg = testing::memory();
        assert!(matches!(
            reg.exists("/").unwrap_err(),
            RegistryError::InvalidPath { .. }
        ));
    }

    #[test]
    fn list_children_sorted() {
        let mut reg = testing::sqlite();
        for p in ["/net/wifi", "/net/eth0", "/net/bt", "/sys"] {
            reg.add_key(p).unwrap();
        }
        assert_eq!(reg.list(None).unwrap(), vec!["net", "sys"]);
        assert_eq!(reg.list(Some("/net")).unwrap(), vec!["bt", "eth0", "wifi"]);
        assert!(reg.list(Some("/sys")).unwrap().is_empty());
        assert!(reg.list(Some("/nope")).unwrap_err().is_not_found());
    }
}
