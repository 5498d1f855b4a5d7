use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PreferenceStore;

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPreferences {
    values: BTreeMap<String, String>,
    saved_at: DateTime<Utc>,
}

/// Preferences persisted as a JSON file, written through on every change.
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
    saved_at: Option<DateTime<Utc>>,
}

impl JsonPreferenceStore {
    /// Open (or create) the store in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create preference directory: {}", dir.display()))?;
        let path = dir.join(PREFERENCES_FILE);

        if !path.exists() {
            return Ok(Self {
                path,
                values: BTreeMap::new(),
                saved_at: None,
            });
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
        let stored: StoredPreferences = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse preferences: {}", path.display()))?;

        debug!(path = %path.display(), count = stored.values.len(), "Loaded preferences");
        Ok(Self {
            path,
            values: stored.values,
            saved_at: Some(stored.saved_at),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// "just now", "5m ago", "3h ago", "2d ago"; `None` if never saved.
    pub fn age_display(&self) -> Option<String> {
        let minutes = (Utc::now() - self.saved_at?).num_minutes();
        Some(if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        })
    }

    fn save(&mut self) -> Result<()> {
        let stored = StoredPreferences {
            values: self.values.clone(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write preferences: {}", self.path.display()))?;
        self.saved_at = Some(stored.saved_at);
        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn delete_prefix(&mut self, prefix: &str) -> Result<()> {
        let before = self.values.len();
        self.values.retain(|k, _| !k.starts_with(prefix));
        if self.values.len() != before {
            debug!(prefix, removed = before - self.values.len(), "Cleared preferences");
            self.save()?;
        }
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
    use chrono::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "registrant-grid-prefs-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = scratch_dir("reopen");
        {
            let mut store = JsonPreferenceStore::open(&dir).unwrap();
            assert!(store.age_display().is_none());
            store.set("3-WL-Email", "jane@").unwrap();
            store.set("3-WL-Grade", "4").unwrap();
            store.delete("3-WL-Grade").unwrap();
        }
        let store = JsonPreferenceStore::open(&dir).unwrap();
        assert_eq!(store.get("3-WL-Email").as_deref(), Some("jane@"));
        assert_eq!(store.get("3-WL-Grade"), None);
        assert_eq!(store.age_display().as_deref(), Some("just now"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = scratch_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(PREFERENCES_FILE), "{not json").unwrap();
        assert!(JsonPreferenceStore::open(&dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_age_display() {
        let dir = scratch_dir("age");
        let mut store = JsonPreferenceStore::open(&dir).unwrap();
        store.saved_at = Some(Utc::now() - Duration::minutes(125));
        assert_eq!(store.age_display().as_deref(), Some("2h ago"));
        store.saved_at = Some(Utc::now() - Duration::days(3));
        assert_eq!(store.age_display().as_deref(), Some("3d ago"));
    }
}
