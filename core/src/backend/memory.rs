use super::{Backend, BackendEvent, ListQuery, SearchQuery};
use crate::error::{BackendError, BackendResult};
use crate::item::{ClipboardItem, ContentType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use tokio::sync::{broadcast, oneshot};

const EVENT_CAPACITY: usize = 64;

type HeldResponse = oneshot::Receiver<BackendResult<Vec<ClipboardItem>>>;

/// One command received by [`MemoryBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ListItems(ListQuery),
    SearchItems(SearchQuery),
    ListFavorites(ListQuery),
    DeleteItem(String),
    ToggleFavorite(String),
    PasteItem { id: String, auto_paste: bool },
    PasteAsPlainText(String),
    GetThumbnail(String),
    OpenPreview(String),
    UpdatePreview(String),
    ClosePreview { animate: bool },
    GetSettings,
    SetSetting { key: String, value: String },
    SetAutostart(bool),
    ClearHistory,
    RunRetentionCleanup,
    ShowWindow,
    HideWindow,
    OpenSettingsWindow,
    ShowCopyHud,
}

impl BackendCall {
    pub fn command(&self) -> &'static str {
        match self {
            BackendCall::ListItems(_) => "list_items",
            BackendCall::SearchItems(_) => "search_items",
            BackendCall::ListFavorites(_) => "list_favorites",
            BackendCall::DeleteItem(_) => "delete_item",
            BackendCall::ToggleFavorite(_) => "toggle_favorite",
            BackendCall::PasteItem { .. } => "paste_item",
            BackendCall::PasteAsPlainText(_) => "paste_as_plain_text",
            BackendCall::GetThumbnail(_) => "get_thumbnail",
            BackendCall::OpenPreview(_) => "open_preview",
            BackendCall::UpdatePreview(_) => "update_preview",
            BackendCall::ClosePreview { .. } => "close_preview",
            BackendCall::GetSettings => "get_settings",
            BackendCall::SetSetting { .. } => "set_setting",
            BackendCall::SetAutostart(_) => "set_autostart",
            BackendCall::ClearHistory => "clear_history",
            BackendCall::RunRetentionCleanup => "run_retention_cleanup",
            BackendCall::ShowWindow => "show_window",
            BackendCall::HideWindow => "hide_window",
            BackendCall::OpenSettingsWindow => "open_settings_window",
            BackendCall::ShowCopyHud => "show_copy_hud",
        }
    }
}

/// In-process backend over a most-recent-first item list.
///
/// Drives the headless shell and the test suites. Every command is recorded,
/// any command can be made to fail with [`MemoryBackend::fail_on`], and
/// listing responses can be held back with [`MemoryBackend::hold_next`].
pub struct MemoryBackend {
    items: RwLock<Vec<ClipboardItem>>,
    settings: RwLock<HashMap<String, String>>,
    thumbnails: RwLock<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<BackendCall>>,
    failing: Mutex<HashSet<&'static str>>,
    held: Mutex<HashMap<&'static str, VecDeque<HeldResponse>>>,
    events: broadcast::Sender<BackendEvent>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryBackend {
    pub fn new(items: Vec<ClipboardItem>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            items: RwLock::new(items),
            settings: RwLock::new(HashMap::new()),
            thumbnails: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            held: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Loads a JSON array of items, most recent first.
    pub fn from_fixture(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let items: Vec<ClipboardItem> =
            serde_json::from_str(&content).context("Failed to parse fixture items")?;
        Ok(Self::new(items))
    }

    pub fn with_settings(self, settings: HashMap<String, String>) -> Self {
        *self.settings.write() = settings;
        self
    }

    pub fn put_thumbnail(&self, id: &str, bytes: Vec<u8>) {
        self.thumbnails.write().insert(id.to_string(), bytes);
    }

    pub fn set_items(&self, items: Vec<ClipboardItem>) {
        *self.items.write() = items;
    }

    pub fn items(&self) -> Vec<ClipboardItem> {
        self.items.read().clone()
    }

    pub fn settings(&self) -> HashMap<String, String> {
        self.settings.read().clone()
    }

    pub fn fail_on(&self, command: &'static str) {
        self.failing.lock().insert(command);
    }

    pub fn recover(&self, command: &'static str) {
        self.failing.lock().remove(command);
    }

    /// The next `list_items`, `search_items` or `list_favorites` call waits
    /// for the response sent through the returned channel instead of
    /// answering from the item list.
    pub fn hold_next(
        &self,
        command: &'static str,
    ) -> oneshot::Sender<BackendResult<Vec<ClipboardItem>>> {
        let (tx, rx) = oneshot::channel();
        self.held.lock().entry(command).or_default().push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<BackendCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Publishes an event to every subscriber. Returns the number of receivers.
    pub fn emit(&self, event: BackendEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    fn record(&self, call: BackendCall) -> BackendResult<()> {
        let command = call.command();
        self.calls.lock().push(call);
        if self.failing.lock().contains(command) {
            return Err(BackendError::Rejected {
                command,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn answer(
        &self,
        command: &'static str,
        computed: Vec<ClipboardItem>,
    ) -> BackendResult<Vec<ClipboardItem>> {
        let held = self
            .held
            .lock()
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        match held {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(BackendError::Transport("response dropped".to_string()))),
            None => Ok(computed),
        }
    }

    fn select(
        &self,
        content_type: Option<ContentType>,
        favorites_only: bool,
        offset: usize,
        limit: usize,
        matches: impl Fn(&ClipboardItem) -> bool,
    ) -> Vec<ClipboardItem> {
        self.items
            .read()
            .iter()
            .filter(|item| content_type.map_or(true, |ct| item.content_type == ct))
            .filter(|item| !favorites_only || item.is_favorited)
            .filter(|item| matches(item))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }
}

fn search_matches(item: &ClipboardItem, needle: &str) -> bool {
    item.plain_text.to_lowercase().contains(needle)
        || item
            .file_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(needle))
        || item.source_app_name.to_lowercase().contains(needle)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn list_items(&self, query: &ListQuery) -> BackendResult<Vec<ClipboardItem>> {
        self.record(BackendCall::ListItems(query.clone()))?;
        let items = self.select(query.content_type, false, query.offset, query.limit, |_| true);
        self.answer("list_items", items).await
    }

    async fn search_items(&self, query: &SearchQuery) -> BackendResult<Vec<ClipboardItem>> {
        self.record(BackendCall::SearchItems(query.clone()))?;
        let needle = query.query.to_lowercase();
        let items = self.select(query.content_type, false, 0, query.limit, |item| {
            search_matches(item, &needle)
        });
        self.answer("search_items", items).await
    }

    async fn list_favorites(&self, query: &ListQuery) -> BackendResult<Vec<ClipboardItem>> {
        self.record(BackendCall::ListFavorites(query.clone()))?;
        let items = self.select(query.content_type, true, query.offset, query.limit, |_| true);
        self.answer("list_favorites", items).await
    }

    async fn delete_item(&self, id: &str) -> BackendResult<()> {
        self.record(BackendCall::DeleteItem(id.to_string()))?;
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn toggle_favorite(&self, id: &str) -> BackendResult<()> {
        self.record(BackendCall::ToggleFavorite(id.to_string()))?;
        {
            let mut items = self.items.write();
            let item = items
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
            item.is_favorited = !item.is_favorited;
        }
        self.emit(BackendEvent::ClipboardChanged {
            id: Some(id.to_string()),
        });
        Ok(())
    }

    async fn paste_item(&self, id: &str, auto_paste: bool) -> BackendResult<()> {
        self.record(BackendCall::PasteItem {
            id: id.to_string(),
            auto_paste,
        })
    }

    async fn paste_as_plain_text(&self, id: &str) -> BackendResult<()> {
        self.record(BackendCall::PasteAsPlainText(id.to_string()))
    }

    async fn get_thumbnail(&self, id: &str) -> BackendResult<Option<Vec<u8>>> {
        self.record(BackendCall::GetThumbnail(id.to_string()))?;
        Ok(self.thumbnails.read().get(id).cloned())
    }

    async fn open_preview(&self, id: &str) -> BackendResult<()> {
        self.record(BackendCall::OpenPreview(id.to_string()))
    }

    async fn update_preview(&self, id: &str) -> BackendResult<()> {
        self.record(BackendCall::UpdatePreview(id.to_string()))
    }

    async fn close_preview(&self, animate: bool) -> BackendResult<()> {
        self.record(BackendCall::ClosePreview { animate })
    }

    async fn get_settings(&self) -> BackendResult<HashMap<String, String>> {
        self.record(BackendCall::GetSettings)?;
        Ok(self.settings.read().clone())
    }

    async fn set_setting(&self, key: &str, value: &str) -> BackendResult<()> {
        self.record(BackendCall::SetSetting {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        self.settings
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_autostart(&self, enabled: bool) -> BackendResult<()> {
        self.record(BackendCall::SetAutostart(enabled))
    }

    async fn clear_history(&self) -> BackendResult<u64> {
        self.record(BackendCall::ClearHistory)?;
        let mut items = self.items.write();
        let before = items.len();
        // favorites survive a clear
        items.retain(|item| item.is_favorited);
        Ok((before - items.len()) as u64)
    }

    async fn run_retention_cleanup(&self) -> BackendResult<u64> {
        self.record(BackendCall::RunRetentionCleanup)?;
        let keep = {
            let settings = self.settings.read();
            match settings.get("retention_policy").map(String::as_str) {
                Some("count") => settings
                    .get("retention_count")
                    .and_then(|count| count.parse::<usize>().ok()),
                _ => None,
            }
        };
        let Some(keep) = keep else {
            return Ok(0);
        };

        let mut items = self.items.write();
        let before = items.len();
        let mut kept = 0usize;
        items.retain(|item| {
            if item.is_favorited {
                return true;
            }
            kept += 1;
            kept <= keep
        });
        Ok((before - items.len()) as u64)
    }

    async fn show_window(&self) -> BackendResult<()> {
        self.record(BackendCall::ShowWindow)
    }

    async fn hide_window(&self) -> BackendResult<()> {
        self.record(BackendCall::HideWindow)
    }

    async fn open_settings_window(&self) -> BackendResult<()> {
        self.record(BackendCall::OpenSettingsWindow)
    }

    async fn show_copy_hud(&self) -> BackendResult<()> {
        self.record(BackendCall::ShowCopyHud)
    }

    fn subscribe(&self) -> broadcast::Receiver<BackendEvent> {
        self.events.subscribe()
    }
}
