//! ramanlab - terminal shell for the Raman lab backend.
//!
//! Logs in, keeps the session between runs, and issues authenticated
//! requests through the shared transport. Notifications and redirects from
//! the session core are printed as they happen.

mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ramanlab_core::{Config, SessionContext};

use commands::Cli;

/// Log file name inside the configured log directory
const LOG_FILE: &str = "ramanlab.log";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=debug). When the config
/// names a log directory, output is also appended to a daily-rotated file
/// there; the returned guard flushes it on drop.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load()
        .unwrap_or_else(|e| {
            eprintln!("Warning: failed to load config ({e:#}), using defaults");
            Config::default()
        })
        .with_env_overrides(|key| std::env::var(key).ok());
    if let Some(ref url) = cli.api_url {
        config.api_base_url = Some(url.clone());
    }

    let _log_guard = init_tracing(&config);
    info!("ramanlab starting");
    debug!(base_url = %config.api_base_url(), storage = ?config.storage, "Configuration loaded");

    let store = config.open_store()?;
    let ctx = SessionContext::from_config(&config, store)?;

    let printer = commands::spawn_event_printer(ctx.shell.subscribe());

    let result = commands::run(cli.command, &ctx, &mut config).await;

    // Let queued notifications reach the terminal before exiting
    drop(ctx);
    commands::finish_event_printer(printer).await;

    info!("ramanlab shutting down");
    result
}
