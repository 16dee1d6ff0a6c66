use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client-side tuning. Every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Items requested per listing or search.
    pub page_size: usize,
    pub search_debounce_ms: u64,
    pub thumbnail_cache_capacity: usize,
    /// Extra attempts when a thumbnail is not materialized yet.
    pub thumbnail_retries: u32,
    pub thumbnail_retry_delay_ms: u64,
    /// How long the "copied" marker stays on an item.
    pub copied_flash_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 200,
            search_debounce_ms: 150,
            thumbnail_cache_capacity: 256,
            thumbnail_retries: 3,
            thumbnail_retry_delay_ms: 500,
            copied_flash_ms: 1500,
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("clipshelf")
            .join("config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Reads `path`, creating it with defaults on first use.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn thumbnail_retry_delay(&self) -> Duration {
        Duration::from_millis(self.thumbnail_retry_delay_ms)
    }

    pub fn copied_flash(&self) -> Duration {
        Duration::from_millis(self.copied_flash_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str("search_debounce_ms = 300").unwrap();
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.page_size, 200);
        assert_eq!(config.thumbnail_retries, 3);
    }

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clipshelf").join("config.toml");

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
        assert!(path.exists());

        fs::write(&path, "page_size = 50\ncopied_flash_ms = 900\n").unwrap();
        let edited = Config::load_from(&path).unwrap();
        assert_eq!(edited.page_size, 50);
        assert_eq!(edited.copied_flash(), Duration::from_millis(900));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "page_size = \"many\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
