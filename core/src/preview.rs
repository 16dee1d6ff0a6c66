//! Open/closed lifecycle of the external preview surface.
//!
//! Local state is authoritative. Backend commands are spawned and never
//! awaited; their failures are only logged.

use crate::backend::Backend;
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreviewState {
    #[default]
    Closed,
    Open {
        item_id: String,
    },
}

#[derive(Debug, Clone)]
enum PreviewCommand {
    Open(String),
    Update(String),
    Close { animate: bool },
}

impl PreviewCommand {
    fn label(&self) -> &'static str {
        match self {
            PreviewCommand::Open(_) => "open",
            PreviewCommand::Update(_) => "update",
            PreviewCommand::Close { .. } => "close",
        }
    }
}

#[derive(Clone)]
pub struct PreviewController {
    backend: Arc<dyn Backend>,
    state: Arc<Mutex<PreviewState>>,
}

impl PreviewController {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(PreviewState::Closed)),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state.lock().clone()
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), PreviewState::Open { .. })
    }

    /// Opens on `item_id`, or closes if already open. With nothing selected a
    /// closed preview stays closed.
    pub fn toggle(&self, item_id: Option<&str>) {
        if self.is_open() {
            self.close();
        } else if let Some(id) = item_id {
            self.open(id);
        }
    }

    pub fn open(&self, item_id: &str) {
        let command = {
            let mut state = self.state.lock();
            let command = match &*state {
                PreviewState::Closed => PreviewCommand::Open(item_id.to_string()),
                PreviewState::Open { item_id: current } if current == item_id => return,
                PreviewState::Open { .. } => PreviewCommand::Update(item_id.to_string()),
            };
            *state = PreviewState::Open {
                item_id: item_id.to_string(),
            };
            command
        };
        self.dispatch(command);
    }

    /// Animated close requested by the user.
    pub fn close(&self) {
        if self.take_open() {
            self.dispatch(PreviewCommand::Close { animate: true });
        }
    }

    /// Closes immediately after the host lost visibility. Returns whether the
    /// preview was open.
    pub fn force_close(&self) -> bool {
        let was_open = self.take_open();
        if was_open {
            debug!("preview force-closed");
            self.dispatch(PreviewCommand::Close { animate: false });
        }
        was_open
    }

    /// Follows the selection while open. No-op when closed.
    pub fn sync_selection(&self, item_id: &str) {
        let command = {
            let mut state = self.state.lock();
            match &mut *state {
                PreviewState::Open { item_id: current } if current != item_id => {
                    *current = item_id.to_string();
                    PreviewCommand::Update(item_id.to_string())
                }
                _ => return,
            }
        };
        self.dispatch(command);
    }

    fn take_open(&self) -> bool {
        let mut state = self.state.lock();
        let was_open = matches!(*state, PreviewState::Open { .. });
        *state = PreviewState::Closed;
        was_open
    }

    fn dispatch(&self, command: PreviewCommand) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            let result = match &command {
                PreviewCommand::Open(id) => backend.open_preview(id).await,
                PreviewCommand::Update(id) => backend.update_preview(id).await,
                PreviewCommand::Close { animate } => backend.close_preview(*animate).await,
            };
            if let Err(e) = result {
                warn!("Preview {} failed: {}", command.label(), e);
            }
        });
    }
}
