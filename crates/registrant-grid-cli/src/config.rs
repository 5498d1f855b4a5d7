//! Application configuration management.
//!
//! Configuration is stored at `~/.config/registrant-grid/config.json`.
//! Every field is optional; `REGISTRANT_GRID_SNAPSHOT` in the environment
//! (or a `.env` file) overrides the snapshot path.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use registrant_grid_core::utils::GraduationDate;
use registrant_grid_core::view::DEFAULT_PAGE_SIZE;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "registrant-grid";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `snapshot_path`
const SNAPSHOT_ENV: &str = "REGISTRANT_GRID_SNAPSHOT";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// JSON export the grid reads and placement writes back to.
    pub snapshot_path: Option<PathBuf>,
    /// Group detail link, with `{group_id}` in place of the id.
    pub group_url_template: Option<String>,
    pub page_size: Option<usize>,
    pub graduation_month: Option<u32>,
    pub graduation_day: Option<u32>,
    /// When set, logs are also written to a daily file here.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Ok(serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding stored filter preferences.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn snapshot_path(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var(SNAPSHOT_ENV) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        self.snapshot_path.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No snapshot configured. Set snapshot_path in {} or {}",
                CONFIG_FILE,
                SNAPSHOT_ENV
            )
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn graduation(&self) -> GraduationDate {
        let default = GraduationDate::default();
        GraduationDate {
            month: self.graduation_month.unwrap_or(default.month),
            day: self.graduation_day.unwrap_or(default.day),
        }
    }

    pub fn group_url_template(&self) -> &str {
        self.group_url_template.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.graduation(), GraduationDate::default());
        assert_eq!(config.group_url_template(), "");
    }

    #[test]
    fn test_partial_graduation_override() {
        let config: Config = serde_json::from_str(r#"{"graduation_month": 7}"#).unwrap();
        assert_eq!(config.graduation(), GraduationDate { month: 7, day: 1 });
        assert!(config.snapshot_path.is_none());
    }
}
