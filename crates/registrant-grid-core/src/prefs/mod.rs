//! User preference storage for filter bar state.
//!
//! Keys are flat strings; the filter bar scopes them with a
//! `<template id>-<view>-` prefix so each template and view keeps its own
//! filters.

pub mod manager;

use std::collections::BTreeMap;

use anyhow::Result;

pub use manager::JsonPreferenceStore;

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn delete(&mut self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`.
    fn delete_prefix(&mut self, prefix: &str) -> Result<()>;

    /// All `(key, value)` pairs under `prefix`, sorted by key.
    fn entries(&self, prefix: &str) -> Vec<(String, String)>;
}

/// Request-scoped store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }

    fn delete_prefix(&mut self, prefix: &str) -> Result<()> {
        self.values.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    fn entries(&self, prefix: &str) -> Vec<(String, String)> {
        self.values
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_prefix_leaves_other_scopes() {
        let mut store = MemoryPreferenceStore::new();
        store.set("7-WL-Email", "a").unwrap();
        store.set("7-WL-Grade", "2").unwrap();
        store.set("7-GroupPlacements-Email", "b").unwrap();
        store.set("8-WL-Email", "c").unwrap();

        store.delete_prefix("7-WL-").unwrap();

        assert_eq!(store.get("7-WL-Email"), None);
        assert_eq!(store.get("7-GroupPlacements-Email").as_deref(), Some("b"));
        assert_eq!(store.entries("8-").len(), 1);
    }
}
