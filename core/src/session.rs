//! Composition root: wires the stores and controllers to one backend and
//! applies key, pointer and backend events to them.

use crate::backend::{Backend, BackendEvent};
use crate::config::Config;
use crate::history::HistoryStore;
use crate::navigation::{self, Focus, KeyInput, KeyOutcome, NavCommand, NavContext, PointerPress};
use crate::preview::PreviewController;
use crate::search::SearchInput;
use crate::settings::{Presenter, SettingsStore};
use crate::thumbnail::ThumbnailCache;
use crate::time::group_spans;
use chrono::{DateTime, Local, TimeZone};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

#[derive(Default)]
struct CopiedFlash {
    item_id: Option<String>,
    generation: u64,
}

#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn Backend>,
    history: HistoryStore,
    preview: PreviewController,
    settings: SettingsStore,
    search: SearchInput,
    thumbnails: ThumbnailCache,
    focus: Arc<Mutex<Focus>>,
    copied: Arc<Mutex<CopiedFlash>>,
    copied_flash: Duration,
}

impl Session {
    pub fn new(backend: Arc<dyn Backend>, config: &Config, presenter: Arc<dyn Presenter>) -> Self {
        let history = HistoryStore::new(Arc::clone(&backend), config.page_size);
        Self {
            preview: PreviewController::new(Arc::clone(&backend)),
            settings: SettingsStore::new(Arc::clone(&backend), presenter),
            search: SearchInput::new(history.clone(), config.search_debounce()),
            thumbnails: ThumbnailCache::new(
                Arc::clone(&backend),
                config.thumbnail_cache_capacity,
                config.thumbnail_retries,
                config.thumbnail_retry_delay(),
            ),
            history,
            backend,
            focus: Arc::new(Mutex::new(Focus::List)),
            copied: Arc::new(Mutex::new(CopiedFlash::default())),
            copied_flash: config.copied_flash(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn preview(&self) -> &PreviewController {
        &self.preview
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn search(&self) -> &SearchInput {
        &self.search
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbnails
    }

    pub fn focus(&self) -> Focus {
        *self.focus.lock()
    }

    pub fn set_focus(&self, focus: Focus) {
        *self.focus.lock() = focus;
    }

    /// Item currently showing the "copied" acknowledgment.
    pub fn copied_item(&self) -> Option<String> {
        self.copied.lock().item_id.clone()
    }

    /// Loads settings, then the first page of history.
    pub async fn start(&self) {
        self.settings.load_settings().await;
        self.history.fetch_items().await;
    }

    pub async fn handle_key(&self, input: &KeyInput) -> KeyOutcome {
        self.handle_key_at(input, &Local::now()).await
    }

    /// Interprets a key with date groups computed against `now`.
    pub async fn handle_key_at<Tz: TimeZone>(&self, input: &KeyInput, now: &DateTime<Tz>) -> KeyOutcome {
        let outcome = {
            let state = self.history.snapshot();
            let groups = group_spans(&state.items, now);
            let ctx = NavContext {
                focus: self.focus(),
                preview_open: self.preview.is_open(),
                selected: state.selected_index,
                len: state.items.len(),
                groups: &groups,
            };
            navigation::interpret(&ctx, input)
        };
        if let Some(command) = outcome.command {
            self.run(command).await;
        }
        outcome
    }

    pub async fn run(&self, command: NavCommand) {
        trace!("running {:?}", command);
        match command {
            NavCommand::Select(index) => self.select(index),
            NavCommand::FocusSearch => self.set_focus(Focus::Input),
            NavCommand::BlurSearch => self.set_focus(Focus::List),
            NavCommand::Paste => {
                if let Some(id) = self.selected_id() {
                    self.paste(&id).await;
                }
            }
            NavCommand::Copy => {
                if let Some(id) = self.selected_id() {
                    self.copy(&id).await;
                }
            }
            NavCommand::TogglePreview => self.preview.toggle(self.selected_id().as_deref()),
            NavCommand::ClosePreview => self.preview.close(),
            NavCommand::HideWindow => {
                if let Err(e) = self.backend.hide_window().await {
                    error!("Failed to hide window: {}", e);
                }
            }
            NavCommand::OpenSettings => {
                if let Err(e) = self.backend.open_settings_window().await {
                    error!("Failed to open settings: {}", e);
                }
            }
        }
    }

    /// Moves the selection and keeps an open preview on it.
    pub fn select(&self, index: usize) {
        self.history.set_selected_index(index);
        if let Some(id) = self.selected_id() {
            self.preview.sync_selection(&id);
        }
    }

    pub async fn paste(&self, id: &str) {
        if let Err(e) = self.backend.paste_item(id, true).await {
            error!("Failed to paste item {}: {}", id, e);
        }
    }

    pub async fn paste_as_plain_text(&self, id: &str) {
        if let Err(e) = self.backend.paste_as_plain_text(id).await {
            error!("Failed to paste {} as plain text: {}", id, e);
        }
    }

    /// Writes the item to the clipboard without pasting, then acknowledges.
    pub async fn copy(&self, id: &str) {
        if let Err(e) = self.backend.paste_item(id, false).await {
            error!("Failed to copy item {}: {}", id, e);
            return;
        }

        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.show_copy_hud().await {
                warn!("Failed to show copy HUD: {}", e);
            }
        });
        self.flash_copied(id);
    }

    pub async fn toggle_favorite(&self, id: &str) {
        if let Err(e) = self.backend.toggle_favorite(id).await {
            error!("Failed to toggle favorite {}: {}", id, e);
            return;
        }
        self.history.refresh_on_change().await;
    }

    pub async fn delete(&self, id: &str) {
        self.history.delete_item(id).await;
        self.thumbnails.remove(id);
    }

    pub fn click(&self, index: usize, press: &PointerPress) {
        if press.activates() {
            self.select(index);
        }
    }

    pub async fn double_click(&self, index: usize, press: &PointerPress) {
        if !press.activates() {
            return;
        }
        self.select(index);
        if let Some(id) = self.selected_id() {
            self.copy(&id).await;
        }
    }

    /// Applies one backend event. Refreshes are spawned so a slow listing
    /// never holds back the events queued behind it.
    pub fn handle_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::ClipboardChanged { id } => {
                debug!("clipboard changed ({:?})", id);
                tokio::spawn(self.history.refresh_on_change());
            }
            BackendEvent::PanelShow { settings } => {
                if let Some(raw) = &settings {
                    self.settings.apply_snapshot(raw);
                }
                tokio::spawn(self.history.on_panel_show());
            }
            BackendEvent::WindowBlur => self.on_blur(),
            BackendEvent::Show => trace!("show replay"),
        }
    }

    /// Host window lost visibility: the preview cannot stay open and
    /// transient acknowledgments are reset.
    pub fn on_blur(&self) {
        self.preview.force_close();
        let mut copied = self.copied.lock();
        copied.generation += 1;
        copied.item_id = None;
    }

    pub async fn show_window(&self) {
        if let Err(e) = self.backend.show_window().await {
            error!("Failed to show window: {}", e);
        }
    }

    /// Removes all non-favorite history, drops cached thumbnails and reloads
    /// the list. Returns the number of removed items.
    pub async fn clear_history(&self) -> u64 {
        let removed = self.settings.clear_history().await;
        self.thumbnails.clear();
        self.history.fetch_items().await;
        removed
    }

    /// Pumps backend events into this session until the returned handle is
    /// dropped or the backend closes its channel.
    pub fn listen(&self) -> Subscription {
        let mut events = self.backend.subscribe();
        let session = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => session.handle_event(event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {} backend events, refreshing", missed);
                        tokio::spawn(session.history.refresh_on_change());
                    }
                    Err(RecvError::Closed) => {
                        debug!("backend event stream closed");
                        break;
                    }
                }
            }
        });
        Subscription { handle }
    }

    fn selected_id(&self) -> Option<String> {
        self.history.snapshot().selected_item().map(|item| item.id.clone())
    }

    fn flash_copied(&self, id: &str) {
        let generation = {
            let mut copied = self.copied.lock();
            copied.generation += 1;
            copied.item_id = Some(id.to_string());
            copied.generation
        };

        let copied = Arc::clone(&self.copied);
        let flash = self.copied_flash;
        tokio::spawn(async move {
            tokio::time::sleep(flash).await;
            let mut copied = copied.lock();
            if copied.generation == generation {
                copied.item_id = None;
            }
        });
    }
}

/// Live event subscription. Dropping it stops the pump.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
