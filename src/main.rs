//! feedsync — polls subscribed RSS feeds, tracks what has been read,
//! downloads attached media and serves a combined HTML view.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐ subscriptions ┌──────────┐ FeedDocument ┌─────────────┐
//! │ store.rs │ ────────────► │ source/  │ ───────────► │ reconcile.rs│
//! └──────────┘               └──────────┘              └─────────────┘
//!      ▲                                                  │ annotated items
//!      │ advanced watermarks                              ▼
//!      │                ┌────────────┐  FeedView  ┌──────────┐
//!      └─────────────── │  sync.rs   │ ◄───────── │ media.rs │
//!                       │ present.rs │            └──────────┘
//!                       └────────────┘
//! ```
//!
//! * **`source/`** — the [`HttpClient`](source::HttpClient) seam, RSS parsing
//!   and the feed document model.
//! * **`store`** — subscriptions and read watermarks, persisted as one file.
//! * **`reconcile`** — decides read/unread per item and the next watermark.
//! * **`media`** — safe file names and attachment downloads.
//! * **`present`** — render model and console report.
//! * **`sync`** — the batch pass (single writer of state) and read-only
//!   snapshots.
//! * **`web`** — HTML page and file server.
//! * **`main`** — parses args, loads config, wires everything together.

mod config;
mod error;
mod logging;
mod media;
mod present;
mod reconcile;
mod seed;
mod source;
mod store;
mod sync;
mod web;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use config::Config;
use error::StoreError;
use source::ReqwestClient;
use store::ApplicationState;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync every feed once, save read state, then serve the HTML view.
    Run {
        /// Exit after the sync instead of serving.
        #[arg(long)]
        no_serve: bool,
    },
    /// Serve the HTML view without syncing.
    Serve,
    /// Add a feed.
    Subscribe { name: String, url: String },
    /// Remove a feed.
    Unsubscribe { url: String },
    /// Show subscriptions and their watermarks.
    List,
    /// Replace the state with random subscriptions to well-known feeds.
    Seed {
        /// Number of subscriptions to draw (1 to 5 when omitted).
        #[arg(long)]
        count: Option<usize>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        logging::init_console_only(&config.logging.level);
    }

    match cli.command.unwrap_or(Command::Run { no_serve: false }) {
        Command::Run { no_serve } => {
            run_batch(&config);
            if !no_serve {
                serve(&config)?;
            }
        }
        Command::Serve => serve(&config)?,
        Command::Subscribe { name, url } => {
            let path = &config.store.path;
            let mut state = store::load_or_default(path)?;
            if state.subscribe(&name, &url) {
                store::save(path, &state)?;
                println!("Subscribed to '{name}' ({url})");
            } else {
                println!("Already subscribed to {url}");
            }
        }
        Command::Unsubscribe { url } => {
            let path = &config.store.path;
            let mut state = store::load_or_default(path)?;
            if state.unsubscribe(&url) {
                store::save(path, &state)?;
                println!("Unsubscribed from {url}");
            } else {
                println!("Not subscribed to {url}");
            }
        }
        Command::List => {
            let state = store::load_or_default(&config.store.path)?;
            print_subscriptions(&state);
        }
        Command::Seed { count } => {
            let mut rng = rand::rng();
            let count = count.unwrap_or_else(|| seed::random_count(&mut rng));
            let state = seed::random_state(&mut rng, count, chrono::Utc::now());
            store::save(&config.store.path, &state)?;
            println!(
                "Saved {} random subscriptions to {}",
                state.subscriptions.len(),
                config.store.path.display()
            );
        }
    }

    Ok(())
}

/// Load state, subscribe configured feeds, sync everything and save.
///
/// Never fails the process: anything that goes wrong is logged and the run
/// continues with what it has.
fn run_batch(config: &Config) {
    let path = &config.store.path;
    let (mut state, writable) = load_for_batch(path);

    for feed in &config.feeds {
        if state.subscribe(&feed.name, &feed.url) {
            info!(feed = %feed.name, url = %feed.url, "subscribed");
        }
    }

    match ReqwestClient::new(&config.http) {
        Ok(client) => {
            let stdout = io::stdout();
            let outcome = sync::run_batch(
                &mut state,
                &client,
                &config.media.download_dir,
                &mut stdout.lock(),
            );
            let s = outcome.summary;
            info!(
                feeds = outcome.feeds.len(),
                synced = s.synced,
                failed = s.failed,
                unread = s.unread,
                media_downloaded = s.media_downloaded,
                media_failed = s.media_failed,
                "sync finished"
            );
        }
        Err(e) => error!("cannot sync feeds: {e}"),
    }

    if !writable {
        warn!("not saving state over {}", path.display());
    } else if let Err(e) = store::save(path, &state) {
        error!("Error saving state: {e}");
    }
}

/// Load the state for a batch run, falling back to an empty state.
///
/// The flag says whether the result may be saved over `path`.  An
/// undecodable file is moved aside first so the save does not destroy it; a
/// file that could not be read at all is left alone and not overwritten.
fn load_for_batch(path: &Path) -> (ApplicationState, bool) {
    match store::load_or_default(path) {
        Ok(state) => (state, true),
        Err(e @ StoreError::Decode { .. }) => {
            error!("Error loading state: {e}");
            match store::quarantine(path) {
                Ok(moved) => {
                    warn!("moved unreadable state to {}", moved.display());
                    (ApplicationState::default(), true)
                }
                Err(e) => {
                    warn!("could not move unreadable state aside: {e}");
                    (ApplicationState::default(), false)
                }
            }
        }
        Err(e) => {
            error!("Error loading state: {e}");
            (ApplicationState::default(), false)
        }
    }
}

fn serve(config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(web::serve(config))
}

fn print_subscriptions(state: &ApplicationState) {
    if state.subscriptions.is_empty() {
        println!("No subscriptions.");
        return;
    }

    for sub in &state.subscriptions {
        let last_read = sub
            .last_read
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into());
        println!("{}\n  url: {}\n  last read: {}", sub.name, sub.url, last_read);
    }
}
