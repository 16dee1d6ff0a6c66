//! Debounced search input that holds back queries during IME composition.

use crate::history::HistoryStore;
use log::trace;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    /// An IME composition is in progress; no query is scheduled.
    Composing,
    /// A debounce timer with this generation is armed.
    Pending(u64),
}

struct Inner {
    phase: SearchPhase,
    generation: u64,
}

impl Inner {
    /// Invalidates any armed timer.
    fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

#[derive(Clone)]
pub struct SearchInput {
    history: HistoryStore,
    debounce: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl SearchInput {
    pub fn new(history: HistoryStore, debounce: Duration) -> Self {
        Self {
            history,
            debounce,
            inner: Arc::new(Mutex::new(Inner {
                phase: SearchPhase::Idle,
                generation: 0,
            })),
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.inner.lock().phase
    }

    /// Stores the text right away and queries once typing pauses.
    pub fn on_change(&self, text: &str) {
        self.history.set_search_query(text);

        let generation = {
            let mut inner = self.inner.lock();
            if inner.phase == SearchPhase::Composing {
                return;
            }
            let generation = inner.bump();
            inner.phase = SearchPhase::Pending(generation);
            generation
        };

        let this = self.clone();
        let text = text.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(this.debounce).await;
            {
                let mut inner = this.inner.lock();
                if inner.phase != SearchPhase::Pending(generation) {
                    trace!("search timer #{} superseded", generation);
                    return;
                }
                inner.phase = SearchPhase::Idle;
            }
            this.query(&text).await;
        });
    }

    pub fn on_composition_start(&self) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.phase = SearchPhase::Composing;
    }

    /// Commits the composed text and queries without waiting.
    pub fn on_composition_end(&self, text: &str) -> impl Future<Output = ()> + Send + 'static {
        self.history.set_search_query(text);
        self.reset();
        self.query(text)
    }

    /// Empties the input and reloads the unsearched list immediately.
    pub fn clear(&self) -> impl Future<Output = ()> + Send + 'static {
        self.history.set_search_query("");
        self.reset();
        self.history.fetch_items()
    }

    fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.bump();
        inner.phase = SearchPhase::Idle;
    }

    fn query(&self, text: &str) -> impl Future<Output = ()> + Send + 'static {
        // HistoryStore::search_items sends blank text to the plain listing
        self.history.search_items(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, ListQuery, MemoryBackend, SearchQuery};

    fn input() -> (Arc<MemoryBackend>, HistoryStore, SearchInput) {
        let backend = Arc::new(MemoryBackend::default());
        let history = HistoryStore::new(backend.clone(), 200);
        let search = SearchInput::new(history.clone(), Duration::from_millis(150));
        (backend, history, search)
    }

    fn searched(query: &str) -> BackendCall {
        BackendCall::SearchItems(SearchQuery {
            query: query.to_string(),
            content_type: None,
            limit: 200,
        })
    }

    fn listed() -> BackendCall {
        BackendCall::ListItems(ListQuery {
            content_type: None,
            limit: 200,
            offset: 0,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_issues_one_query() {
        let (backend, history, search) = input();
        search.on_change("a");
        search.on_change("ab");
        search.on_change("abc ");
        assert_eq!(history.snapshot().search_query, "abc ");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(backend.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.calls(), vec![searched("abc")]);
        assert_eq!(search.phase(), SearchPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn composition_suspends_then_flushes() {
        let (backend, history, search) = input();
        search.on_change("n");
        search.on_composition_start();
        search.on_change("ni");
        assert_eq!(search.phase(), SearchPhase::Composing);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(backend.calls().is_empty());

        search.on_composition_end("你").await;
        assert_eq!(backend.calls(), vec![searched("你")]);
        assert_eq!(history.snapshot().search_query, "你");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_fetches_immediately_and_cancels_timer() {
        let (backend, history, search) = input();
        search.on_change("abc");
        search.clear().await;
        assert_eq!(backend.calls(), vec![listed()]);
        assert_eq!(history.snapshot().search_query, "");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(backend.calls(), vec![listed()]);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_text_lists_after_debounce() {
        let (backend, _, search) = input();
        search.on_change("   ");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(backend.calls(), vec![listed()]);
    }
}
