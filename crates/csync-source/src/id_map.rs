//! Persistent key to id lookup, organized by category

use crate::Result;
use csync_fs::{ConfigStore, NormalizedPath};
use csync_model::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Flat key→id table per content category.
///
/// Loaded before and saved after a run so ids assigned by the live source
/// are reproduced in later package builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap {
    categories: BTreeMap<String, BTreeMap<String, String>>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`, or start empty when the file does not exist.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let map: Self = ConfigStore::new().load_or_default(path)?;
        debug!(path = %path, entries = map.len(), "Loaded id map");
        Ok(map)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        ConfigStore::new().save(path, self)?;
        debug!(path = %path, entries = self.len(), "Saved id map");
        Ok(())
    }

    pub fn get(&self, category: Category, key: &str) -> Option<&str> {
        self.categories
            .get(category.config_key())?
            .get(key)
            .map(String::as_str)
    }

    pub fn insert(&mut self, category: Category, key: impl Into<String>, id: impl Into<String>) {
        self.categories
            .entry(category.config_key().to_string())
            .or_default()
            .insert(key.into(), id.into());
    }

    /// Id recorded for `key`, allocating a fresh UUID when none exists.
    pub fn id_for(&mut self, category: Category, key: &str) -> String {
        if let Some(id) = self.get(category, key) {
            return id.to_string();
        }
        let id = uuid::Uuid::new_v4().to_string();
        debug!(category = category.config_key(), key, id = %id, "Allocated id");
        self.insert(category, key, id.clone());
        id
    }

    pub fn remove(&mut self, category: Category, key: &str) -> Option<String> {
        self.categories.get_mut(category.config_key())?.remove(key)
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn id_for_is_stable() {
        let mut map = IdMap::new();
        let first = map.id_for(Category::FolderContent, "/a");
        let second = map.id_for(Category::FolderContent, "/a");
        assert_eq!(first, second);
        assert_ne!(first, map.id_for(Category::FolderContent, "/b"));
        assert_eq!(map.get(Category::NotificationContent, "/a"), None);
    }

    #[rstest]
    #[case("ids.toml")]
    #[case("ids.json")]
    #[case("ids.yaml")]
    fn persists_through_config_store(#[case] file: &str) {
        let dir = TempDir::new().unwrap();
        let path = NormalizedPath::new(dir.path().join(file));

        let mut map = IdMap::new();
        map.insert(Category::FolderContent, "/reports", "17");
        map.insert(Category::NotificationContent, "/alerts", "42");
        map.save(&path).unwrap();

        assert_eq!(IdMap::load(&path).unwrap(), map);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let map = IdMap::load(&NormalizedPath::new(dir.path().join("none.toml"))).unwrap();
        assert!(map.is_empty());
    }
}
