//! Request/response and event boundary to the process that owns storage,
//! clipboard capture and paste simulation.

use crate::error::BackendResult;
use crate::item::{ClipboardItem, ContentType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

mod memory;

pub use memory::{BackendCall, MemoryBackend};

/// Arguments for the history and favorites listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub content_type: Option<ContentType>,
    pub limit: usize,
    pub offset: usize,
}

/// Arguments for free-text search. `query` is already trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub content_type: Option<ContentType>,
    pub limit: usize,
}

/// Events published by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BackendEvent {
    /// The stored history changed (capture, favorite flip, cleanup).
    ClipboardChanged { id: Option<String> },
    /// The panel became visible; may carry the current settings map.
    PanelShow {
        settings: Option<HashMap<String, String>>,
    },
    /// The host window lost foreground state.
    WindowBlur,
    /// Slide-in replay signal. Presentation only.
    Show,
}

#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_items(&self, query: &ListQuery) -> BackendResult<Vec<ClipboardItem>>;

    async fn search_items(&self, query: &SearchQuery) -> BackendResult<Vec<ClipboardItem>>;

    async fn list_favorites(&self, query: &ListQuery) -> BackendResult<Vec<ClipboardItem>>;

    async fn delete_item(&self, id: &str) -> BackendResult<()>;

    /// Flips the favorite flag. Callers re-fetch to observe it.
    async fn toggle_favorite(&self, id: &str) -> BackendResult<()>;

    /// Writes the item back to the system clipboard, then pastes into the
    /// frontmost application when `auto_paste` is set.
    async fn paste_item(&self, id: &str, auto_paste: bool) -> BackendResult<()>;

    async fn paste_as_plain_text(&self, id: &str) -> BackendResult<()>;

    /// `Ok(None)` or an empty buffer means the thumbnail is not materialized yet.
    async fn get_thumbnail(&self, id: &str) -> BackendResult<Option<Vec<u8>>>;

    async fn open_preview(&self, id: &str) -> BackendResult<()>;

    async fn update_preview(&self, id: &str) -> BackendResult<()>;

    async fn close_preview(&self, animate: bool) -> BackendResult<()>;

    async fn get_settings(&self) -> BackendResult<HashMap<String, String>>;

    async fn set_setting(&self, key: &str, value: &str) -> BackendResult<()>;

    async fn set_autostart(&self, enabled: bool) -> BackendResult<()>;

    /// Returns the number of removed items.
    async fn clear_history(&self) -> BackendResult<u64>;

    async fn run_retention_cleanup(&self) -> BackendResult<u64>;

    async fn show_window(&self) -> BackendResult<()>;

    async fn hide_window(&self) -> BackendResult<()>;

    async fn open_settings_window(&self) -> BackendResult<()>;

    async fn show_copy_hud(&self) -> BackendResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent>;
}
