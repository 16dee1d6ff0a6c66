use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use clipshelf::{
    format_size, group_spans, relative_time, Appearance, Config, FilterType, KeyInput,
    MemoryBackend, Presenter, Session, ViewMode,
};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "clipshelf")]
#[command(version)]
#[command(about = "headless driver for the clipboard history session")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fixture's history grouped by recency
    List {
        /// JSON array of clipboard items, most recent first
        #[arg(long)]
        fixture: PathBuf,
        /// all, text, rich_text, image or file
        #[arg(long, default_value = "all")]
        filter: String,
        /// Show favorites only
        #[arg(long)]
        favorites: bool,
        /// Search text
        #[arg(long)]
        query: Option<String>,
    },
    /// Replay key presses (e.g. `down`, `space`, `ctrl+c`) and print the result
    Keys {
        #[arg(long)]
        fixture: PathBuf,
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Print the active configuration
    Config,
}

/// Logs presentation effects instead of rendering them.
struct LogPresenter;

impl Presenter for LogPresenter {
    fn apply_theme(&self, appearance: Appearance) {
        info!("theme -> {:?}", appearance);
    }

    fn apply_language(&self, language: &str) {
        info!("language -> {}", language);
    }

    fn prefers_dark(&self) -> bool {
        true
    }

    fn system_locale(&self) -> String {
        std::env::var("LANG").unwrap_or_else(|_| "en".to_string())
    }
}

fn session_for(fixture: &Path, config: &Config) -> Result<(Arc<MemoryBackend>, Session)> {
    let backend = Arc::new(MemoryBackend::from_fixture(fixture)?);
    let session = Session::new(backend.clone(), config, Arc::new(LogPresenter));
    Ok((backend, session))
}

fn print_list(session: &Session) {
    let state = session.history().snapshot();
    if state.items.is_empty() {
        println!("(no items)");
        return;
    }

    let now = Utc::now();
    for span in group_spans(&state.items, &Local::now()) {
        println!("{}", span.group);
        for index in span.start..span.end() {
            let item = &state.items[index];
            let marker = if index == state.selected_index { '>' } else { ' ' };
            let star = if item.is_favorited { '*' } else { ' ' };
            let text: String = item.plain_text.chars().take(60).collect();
            println!(
                "{}{} {:<60}  {:>10}  {:>8}  {}",
                marker,
                star,
                text.replace('\n', " "),
                relative_time(&item.updated_at, &now),
                format_size(item.content_size),
                item.source_app_name,
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::List {
            fixture,
            filter,
            favorites,
            query,
        } => {
            let Some(filter) = FilterType::parse(&filter) else {
                bail!("unknown filter: {}", filter);
            };
            let (_, session) = session_for(&fixture, &config)?;
            let history = session.history();

            if let Some(query) = &query {
                history.set_search_query(query);
            }
            if favorites {
                history.set_view_mode(ViewMode::Pins).await;
            }
            history.set_filter_type(filter).await;
            print_list(&session);
        }
        Commands::Keys { fixture, keys } => {
            let inputs = keys
                .iter()
                .map(|key| key.parse::<KeyInput>())
                .collect::<Result<Vec<_>, _>>()?;

            let (backend, session) = session_for(&fixture, &config)?;
            session.show_window().await;
            session.start().await;
            backend.take_calls();

            for input in &inputs {
                let outcome = session.handle_key(input).await;
                println!("{:<12} {:?}", format!("{:?}", input.key), outcome.command);
            }
            // let fire-and-forget preview commands land
            tokio::time::sleep(Duration::from_millis(50)).await;

            print_list(&session);
            println!("focus: {:?}", session.focus());
            println!("preview: {:?}", session.preview().state());
            for call in backend.calls() {
                println!("call: {:?}", call);
            }
        }
        Commands::Config => {
            println!("# {}", Config::path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
