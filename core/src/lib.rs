pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod item;
pub mod navigation;
pub mod preview;
pub mod search;
pub mod sequencer;
pub mod session;
pub mod settings;
pub mod thumbnail;
pub mod time;

pub use backend::{Backend, BackendCall, BackendEvent, ListQuery, MemoryBackend, SearchQuery};
pub use config::Config;
pub use error::{BackendError, BackendResult};
pub use history::{HistoryStore, SessionState};
pub use item::{ClipboardItem, ContentType, FilterType, ViewMode};
pub use navigation::{Focus, Key, KeyInput, KeyOutcome, NavCommand, PointerKind, PointerPress};
pub use preview::{PreviewController, PreviewState};
pub use search::{SearchInput, SearchPhase};
pub use session::{Session, Subscription};
pub use settings::{Appearance, Presenter, SettingKey, Settings, SettingsStore, Theme};
pub use thumbnail::ThumbnailCache;
pub use time::{date_group, format_size, group_spans, relative_time, DateGroup, GroupSpan};
