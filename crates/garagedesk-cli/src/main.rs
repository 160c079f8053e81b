//! garagedesk - a command-line front-end for the auto-repair shop backend.
//!
//! Manage the session (login, logout, profile) and browse clients,
//! vehicles, inventory, appointments and the job-card board.

mod commands;
mod output;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use garagedesk_core::{ApiClient, ApiError, BoardError, Config, SessionManager, ShopApi};

/// Log file name prefix in the cache directory
const LOG_FILE: &str = "garagedesk.log";

#[derive(Parser, Debug)]
#[command(name = "garagedesk", version, about = "Auto-repair shop management from the terminal")]
struct Cli {
    /// Backend origin, e.g. https://shop.example.com (the API lives under /api)
    #[arg(long, global = true, env = "GARAGEDESK_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the token pair
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the stored token pair
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Create a new user account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
    },
    /// Change your password
    Passwd,
    /// Refresh the access token now
    Refresh,
    /// List clients
    Clients,
    /// List vehicles
    Vehicles {
        /// Only vehicles owned by this client id
        #[arg(long)]
        client: Option<i64>,
    },
    /// List employees
    Employees,
    /// List inventory
    Inventory {
        /// Only items at or below their reorder level
        #[arg(long)]
        low: bool,
    },
    /// List appointments
    Appointments {
        /// Hide appointments in the past
        #[arg(long)]
        upcoming: bool,
    },
    /// Show the job-card board
    Jobs,
    /// Move a job card to another status column
    Move {
        id: i64,
        /// pending, in_progress, awaiting_parts, completed or delivered
        status: String,
        /// Position in the target column (default: end)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Counts across the shop, fetched concurrently
    Summary,
}

/// Daily rolling log file in `dir`.
fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Initialize the tracing subscriber for logging.
/// Console output honours RUST_LOG (default warn); the log file in the
/// cache directory records info and above. Without a usable cache
/// directory only the console layer is installed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let console = fmt::layer().with_writer(io::stderr).with_filter(console_filter);

    let appender = log_dir.map(|dir| {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))
            .and_then(|_| file_appender(dir))
    });
    let (file, guard, file_error) = match appender {
        Some(Ok(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("info"));
            (Some(layer), Some(guard), None)
        }
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    if let Some(e) = file_error {
        warn!("File logging disabled: {:#}", e);
    }
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url.clone() {
        config.base_url = url;
    }

    let cache_dir = config.cache_dir().ok();
    let _log_guard = init_tracing(cache_dir.as_deref());
    info!(base_url = %config.base_url, "garagedesk starting");

    let store = config.open_token_store()?;
    let api = ApiClient::new(&config.client_config(), store)?;
    let session = SessionManager::new(api.clone());
    let shop = ShopApi::new(api);

    let result = commands::run(cli.command, &mut config, &session, &shop).await;

    if let Err(ref err) = result {
        if let Some(api_err) = auth_error(err) {
            if session.handle_auth_failure(api_err) {
                eprintln!("Your session has ended. Run `garagedesk login` to sign in again.");
            }
        }
    }
    result
}

fn auth_error(err: &anyhow::Error) -> Option<&ApiError> {
    if let Some(api_err) = err.downcast_ref::<ApiError>() {
        return Some(api_err);
    }
    match err.downcast_ref::<BoardError>() {
        Some(BoardError::Sync(api_err)) => Some(api_err),
        _ => None,
    }
}
