//! Session store for the visible clipboard list and the query that produced it.
//!
//! Every list-producing operation is split in two: the synchronous part runs
//! when the method is called (state change, staleness token), and the returned
//! future performs the backend call and applies the response. Issuance order is
//! therefore call order, whatever order the futures happen to complete in.

use crate::backend::{Backend, ListQuery, SearchQuery};
use crate::item::{ClipboardItem, FilterType, ViewMode};
use crate::sequencer::{RequestSequencer, Token};
use log::{debug, error};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub items: Vec<ClipboardItem>,
    pub loading: bool,
    pub search_query: String,
    pub filter_type: FilterType,
    pub view_mode: ViewMode,
    pub selected_index: usize,
}

impl SessionState {
    pub fn selected_item(&self) -> Option<&ClipboardItem> {
        self.items.get(self.selected_index)
    }

    fn replace_items(&mut self, items: Vec<ClipboardItem>) {
        self.items = items;
        self.loading = false;
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        self.selected_index = self.selected_index.min(self.items.len().saturating_sub(1));
    }

    /// The trimmed query, if any text remains.
    fn active_query(&self) -> Option<String> {
        let trimmed = self.search_query.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
enum Request {
    List(ListQuery),
    Search(SearchQuery),
    Favorites(ListQuery),
}

impl Request {
    fn label(&self) -> &'static str {
        match self {
            Request::List(_) => "fetch items",
            Request::Search(_) => "search items",
            Request::Favorites(_) => "fetch favorites",
        }
    }
}

/// Owner of [`SessionState`]. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn Backend>,
    sequencer: Arc<RequestSequencer>,
    state: Arc<watch::Sender<SessionState>>,
    page_size: usize,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn Backend>, page_size: usize) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            backend,
            sequencer: Arc::new(RequestSequencer::new()),
            state: Arc::new(state),
            page_size,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every observable state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn fetch_items(&self) -> impl Future<Output = ()> + Send + 'static {
        let content_type = self.state.borrow().filter_type.content_type();
        self.issue(Request::List(ListQuery {
            content_type,
            limit: self.page_size,
            offset: 0,
        }))
    }

    /// Callers route blank queries to [`HistoryStore::fetch_items`]; a blank
    /// query reaching this point is treated the same way.
    pub fn search_items(&self, query: &str) -> impl Future<Output = ()> + Send + 'static {
        let content_type = self.state.borrow().filter_type.content_type();
        let query = query.trim();
        if query.is_empty() {
            debug!("blank search routed to listing");
            return self.issue(Request::List(ListQuery {
                content_type,
                limit: self.page_size,
                offset: 0,
            }));
        }
        self.issue(Request::Search(SearchQuery {
            query: query.to_string(),
            content_type,
            limit: self.page_size,
        }))
    }

    /// Favorites ignore the search text.
    pub fn fetch_favorites(&self) -> impl Future<Output = ()> + Send + 'static {
        let content_type = self.state.borrow().filter_type.content_type();
        self.issue(Request::Favorites(ListQuery {
            content_type,
            limit: self.page_size,
            offset: 0,
        }))
    }

    pub fn set_filter_type(&self, filter: FilterType) -> impl Future<Output = ()> + Send + 'static {
        self.state.send_modify(|state| {
            state.filter_type = filter;
            state.selected_index = 0;
        });
        self.refresh()
    }

    /// Switching tabs resets search scope: the history tab always reloads the
    /// unsearched list, even though the query text is kept.
    pub fn set_view_mode(&self, mode: ViewMode) -> impl Future<Output = ()> + Send + 'static {
        self.state.send_modify(|state| {
            state.view_mode = mode;
            state.selected_index = 0;
        });
        let content_type = self.state.borrow().filter_type.content_type();
        let query = ListQuery {
            content_type,
            limit: self.page_size,
            offset: 0,
        };
        match mode {
            ViewMode::History => self.issue(Request::List(query)),
            ViewMode::Pins => self.issue(Request::Favorites(query)),
        }
    }

    /// Stores the text only. The search input decides when to query.
    pub fn set_search_query(&self, query: &str) {
        self.state.send_modify(|state| {
            state.search_query = query.to_string();
            state.selected_index = 0;
        });
    }

    pub fn set_selected_index(&self, index: usize) {
        self.state.send_if_modified(|state| {
            let clamped = index.min(state.items.len().saturating_sub(1));
            if state.selected_index == clamped {
                return false;
            }
            state.selected_index = clamped;
            true
        });
    }

    /// Removes the item locally once the backend confirms. The token is
    /// advanced so a listing issued earlier cannot bring the item back.
    pub fn delete_item(&self, id: &str) -> impl Future<Output = ()> + Send + 'static {
        let id = id.to_string();
        let backend = Arc::clone(&self.backend);
        let sequencer = Arc::clone(&self.sequencer);
        let state = Arc::clone(&self.state);

        async move {
            if let Err(e) = backend.delete_item(&id).await {
                error!("Failed to delete item {}: {}", id, e);
                return;
            }
            state.send_modify(|state| {
                sequencer.next_token();
                state.items.retain(|item| item.id != id);
                // whatever listing was in flight has just been superseded
                state.loading = false;
                state.clamp_selection();
            });
        }
    }

    /// Re-issues the query matching the current view without touching any
    /// view state. Used when the backend reports changed data.
    pub fn refresh_on_change(&self) -> impl Future<Output = ()> + Send + 'static {
        self.refresh()
    }

    /// Same as [`HistoryStore::refresh_on_change`]; the panel keeps its tab,
    /// filter, query and selection across hide/show.
    pub fn on_panel_show(&self) -> impl Future<Output = ()> + Send + 'static {
        self.refresh()
    }

    fn refresh(&self) -> impl Future<Output = ()> + Send + 'static {
        let request = {
            let state = self.state.borrow();
            let content_type = state.filter_type.content_type();
            let list = ListQuery {
                content_type,
                limit: self.page_size,
                offset: 0,
            };
            match (state.view_mode, state.active_query()) {
                (ViewMode::Pins, _) => Request::Favorites(list),
                (ViewMode::History, Some(query)) => Request::Search(SearchQuery {
                    query,
                    content_type,
                    limit: self.page_size,
                }),
                (ViewMode::History, None) => Request::List(list),
            }
        };
        self.issue(request)
    }

    fn issue(&self, request: Request) -> impl Future<Output = ()> + Send + 'static {
        let token = self.sequencer.next_token();
        self.state.send_modify(|state| state.loading = true);
        debug!("{} issued as #{}", request.label(), token.value());

        let backend = Arc::clone(&self.backend);
        let sequencer = Arc::clone(&self.sequencer);
        let state = Arc::clone(&self.state);

        async move {
            let result = match &request {
                Request::List(query) => backend.list_items(query).await,
                Request::Search(query) => backend.search_items(query).await,
                Request::Favorites(query) => backend.list_favorites(query).await,
            };
            apply(&state, &sequencer, token, request.label(), result);
        }
    }
}

fn apply(
    state: &watch::Sender<SessionState>,
    sequencer: &RequestSequencer,
    token: Token,
    label: &'static str,
    result: crate::error::BackendResult<Vec<ClipboardItem>>,
) {
    // The check runs under the state lock so a concurrent delete cannot slip
    // between it and the write.
    state.send_if_modified(|state| {
        if !sequencer.is_latest(token) {
            debug!("discarding stale {} #{}", label, token.value());
            return false;
        }
        match result {
            Ok(items) => state.replace_items(items),
            Err(e) => {
                error!("Failed to {}: {}", label, e);
                state.loading = false;
            }
        }
        true
    });
}
