//! Write-through cache of the backend's key/value settings.

use crate::backend::Backend;
use log::{debug, error};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    Shortcut,
    AutoStart,
    Theme,
    Language,
    RetentionPolicy,
    RetentionDays,
    RetentionCount,
    MaxItemSizeMb,
    CloseOnBlur,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::Shortcut,
        SettingKey::AutoStart,
        SettingKey::Theme,
        SettingKey::Language,
        SettingKey::RetentionPolicy,
        SettingKey::RetentionDays,
        SettingKey::RetentionCount,
        SettingKey::MaxItemSizeMb,
        SettingKey::CloseOnBlur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Shortcut => "shortcut",
            SettingKey::AutoStart => "auto_start",
            SettingKey::Theme => "theme",
            SettingKey::Language => "language",
            SettingKey::RetentionPolicy => "retention_policy",
            SettingKey::RetentionDays => "retention_days",
            SettingKey::RetentionCount => "retention_count",
            SettingKey::MaxItemSizeMb => "max_item_size_mb",
            SettingKey::CloseOnBlur => "close_on_blur",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            SettingKey::Shortcut => "CommandOrControl+Shift+V",
            SettingKey::AutoStart => "false",
            SettingKey::Theme => "dark",
            SettingKey::Language => "system",
            SettingKey::RetentionPolicy => "unlimited",
            SettingKey::RetentionDays => "0",
            SettingKey::RetentionCount => "0",
            SettingKey::MaxItemSizeMb => "10",
            SettingKey::CloseOnBlur => "true",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
    /// Follow the host's appearance.
    System,
}

impl Theme {
    /// Unknown values fall back to the default dark theme.
    pub fn parse(value: &str) -> Self {
        match value {
            "light" => Theme::Light,
            "system" => Theme::System,
            _ => Theme::Dark,
        }
    }
}

/// A theme after `system` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Appearance {
    Dark,
    Light,
}

/// The host side of settings effects: applying a theme or language and
/// reporting the host's own preferences.
pub trait Presenter: Send + Sync {
    fn apply_theme(&self, appearance: Appearance);

    fn apply_language(&self, language: &str);

    fn prefers_dark(&self) -> bool;

    fn system_locale(&self) -> String;
}

pub fn resolve_theme(theme: Theme, prefers_dark: bool) -> Appearance {
    match theme {
        Theme::Dark => Appearance::Dark,
        Theme::Light => Appearance::Light,
        Theme::System if prefers_dark => Appearance::Dark,
        Theme::System => Appearance::Light,
    }
}

pub fn resolve_language(language: &str, system_locale: &str) -> String {
    match language {
        "system" if system_locale.starts_with("zh") => "zh".to_string(),
        "system" => "en".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    values: HashMap<SettingKey, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            values: SettingKey::ALL
                .into_iter()
                .map(|key| (key, key.default_value().to_string()))
                .collect(),
        }
    }
}

impl Settings {
    /// Known keys from `raw`, defaults for the rest. Unknown keys are dropped.
    pub fn from_raw(raw: &HashMap<String, String>) -> Self {
        let mut settings = Self::default();
        for (key, value) in raw {
            match SettingKey::parse(key) {
                Some(key) => settings.set(key, value),
                None => debug!("ignoring unknown setting {}", key),
            }
        }
        settings
    }

    pub fn get(&self, key: SettingKey) -> &str {
        self.values
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_value())
    }

    pub fn set(&mut self, key: SettingKey, value: &str) {
        self.values.insert(key, value.to_string());
    }

    pub fn theme(&self) -> Theme {
        Theme::parse(self.get(SettingKey::Theme))
    }

    pub fn language(&self) -> &str {
        self.get(SettingKey::Language)
    }

    pub fn auto_start(&self) -> bool {
        self.get(SettingKey::AutoStart) == "true"
    }

    pub fn close_on_blur(&self) -> bool {
        self.get(SettingKey::CloseOnBlur) == "true"
    }
}

#[derive(Default)]
struct Inner {
    settings: Settings,
    loaded: bool,
}

#[derive(Clone)]
pub struct SettingsStore {
    backend: Arc<dyn Backend>,
    presenter: Arc<dyn Presenter>,
    inner: Arc<RwLock<Inner>>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn Backend>, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            backend,
            presenter,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner.read().settings.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().loaded
    }

    /// A failed load still counts as loaded, with defaults applied.
    pub async fn load_settings(&self) {
        match self.backend.get_settings().await {
            Ok(raw) => self.apply_snapshot(&raw),
            Err(e) => {
                error!("Failed to load settings: {}", e);
                self.inner.write().loaded = true;
                self.apply_effects(&Settings::default());
            }
        }
    }

    /// Adopts a settings map pushed by the backend, e.g. with a panel show.
    pub fn apply_snapshot(&self, raw: &HashMap<String, String>) {
        let settings = Settings::from_raw(raw);
        {
            let mut inner = self.inner.write();
            inner.settings = settings.clone();
            inner.loaded = true;
        }
        self.apply_effects(&settings);
    }

    /// Persists one key, then applies its local effect. Nothing changes
    /// locally when the write is rejected.
    pub async fn update_setting(&self, key: SettingKey, value: &str) {
        if let Err(e) = self.backend.set_setting(key.as_str(), value).await {
            error!("Failed to update setting {}: {}", key, e);
            return;
        }
        self.inner.write().settings.set(key, value);

        match key {
            SettingKey::Theme => self.apply_theme(Theme::parse(value)),
            SettingKey::Language => self.apply_language(value),
            SettingKey::AutoStart => {
                if let Err(e) = self.backend.set_autostart(value == "true").await {
                    error!("Failed to toggle autostart: {}", e);
                }
            }
            _ => {}
        }
    }

    /// Returns the number of removed items, 0 on failure. The caller
    /// re-fetches the list.
    pub async fn clear_history(&self) -> u64 {
        self.backend.clear_history().await.unwrap_or_else(|e| {
            error!("Failed to clear history: {}", e);
            0
        })
    }

    pub async fn run_retention_cleanup(&self) -> u64 {
        self.backend.run_retention_cleanup().await.unwrap_or_else(|e| {
            error!("Failed to run retention cleanup: {}", e);
            0
        })
    }

    pub fn on_system_appearance_changed(&self) {
        if self.settings().theme() == Theme::System {
            self.apply_theme(Theme::System);
        }
    }

    pub fn on_system_locale_changed(&self) {
        if self.settings().language() == "system" {
            self.apply_language("system");
        }
    }

    fn apply_effects(&self, settings: &Settings) {
        self.apply_theme(settings.theme());
        self.apply_language(settings.language());
    }

    fn apply_theme(&self, theme: Theme) {
        let appearance = resolve_theme(theme, self.presenter.prefers_dark());
        self.presenter.apply_theme(appearance);
    }

    fn apply_language(&self, language: &str) {
        let resolved = resolve_language(language, &self.presenter.system_locale());
        self.presenter.apply_language(&resolved);
    }
}
