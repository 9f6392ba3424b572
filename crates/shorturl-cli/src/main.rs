//! ShortURL - an interactive terminal client for the ShortURL link shortener.
//!
//! Shorten links, manage them and read their analytics. A URL submitted
//! while signed out is kept until you log in and then offered again.

mod app;
mod commands;
mod views;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shorturl_core::{ApiClient, Config, FileStore, IntentStore, MemoryStore, Route, Session, SessionController};

use app::{App, TerminalRouter};

/// Log file name inside the cache directory
const LOG_FILE: &str = "shorturl.log";

#[derive(Debug, Parser)]
#[command(name = "shorturl", version, about = "Terminal client for the ShortURL link shortener")]
struct Args {
    /// API server, e.g. http://localhost:3000 (overrides config and environment)
    #[arg(long)]
    api_url: Option<String>,

    /// Origin short links are served from (overrides config and environment)
    #[arg(long)]
    public_url: Option<String>,

    /// Username to pre-fill at login
    #[arg(long)]
    username: Option<String>,
}

/// Initialize the tracing subscriber for logging.
///
/// stdout belongs to the prompt, so log lines go to a file in the cache
/// directory. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = config.cache_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    let _log_guard = match init_tracing(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            None
        }
    };
    info!("ShortURL client starting");
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    if args.username.is_some() {
        config.last_username = args.username.clone();
    }
    let api_url = args.api_url.unwrap_or_else(|| config.api_base_url());
    let public_url = args.public_url.unwrap_or_else(|| config.public_base_url());

    // Credential survives restarts; the pending URL lives as long as this process
    let persistent = Arc::new(FileStore::new(&config.data_dir()?).context("Failed to open local storage")?);
    info!(path = %persistent.path().display(), "Using local storage");
    let session = Arc::new(Session::init(persistent));
    let intents = IntentStore::new(Arc::new(MemoryStore::new()));
    let api = ApiClient::new(&api_url, config.request_timeout(), session.clone())?;

    let start = if session.is_authenticated() {
        Route::Dashboard
    } else {
        Route::Home
    };
    let controller = SessionController::new(session, intents, api, TerminalRouter::new(start), &public_url);

    let mut app = App::new(controller, config, None);
    let result = app.run().await;

    info!("ShortURL client shutting down");
    result
}
