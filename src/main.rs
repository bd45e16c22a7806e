//! # Newsmap Relay
//!
//! Watches a live news map for new posts and relays each one to a
//! Discord-compatible webhook.
//!
//! ## Usage
//!
//! ```sh
//! newsmap_relay -c config.json
//! ```
//!
//! ## Architecture
//!
//! Every poll cycle runs the same pipeline:
//! 1. **Fetching**: download the list page
//! 2. **Extracting**: locate the latest post and read its fields
//! 3. **Comparing**: stop here if its id equals the stored cursor
//! 4. **Enriching**: download and read the post's detail page
//! 5. **Notifying**: post the formatted message to the webhook
//! 6. **Persisting**: store the post id as the new cursor
//!
//! Cycles are strictly sequential and separated by a randomized sleep.
//! Ctrl-C ends the process cleanly with exit code 0.

use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dom;
mod error;
mod fetch;
mod models;
mod outputs;
mod poller;
mod retry;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::Config;
use fetch::HttpFetcher;
use outputs::webhook::WebhookNotifier;
use poller::{CycleOutcome, PollSettings, Poller};
use retry::RetryNotify;
use store::StateBackend;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "newsmap_relay starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, once = args.once, dry_run = args.dry_run, "Parsed CLI arguments");

    // ---- Load config ----
    let mut config = Config::load(&args.config)?;
    if let Some(url) = args.webhook_url.clone() {
        config.webhook_url = url;
    }
    if let Some(url) = args.feed_url.clone() {
        config.feed_url = url;
    }
    config.validate(!args.dry_run)?;

    if config.debug {
        if let Err(e) = ensure_writable_dir(&config.debug_dir).await {
            warn!(
                path = %config.debug_dir.display(),
                error = %e,
                "Debug directory is not writable; page captures will fail"
            );
        }
    }

    // ---- Wire components ----
    let store = StateBackend::open(&config, &args.config).await?;
    let source = HttpFetcher::new(&config)?;
    let webhook = WebhookNotifier::new(
        config.webhook_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let notifier = RetryNotify::new(webhook, 3, Duration::from_secs(1));
    let settings = PollSettings::from_config(&config, args.dry_run)?;
    let mut poller = Poller::new(source, notifier, store, settings);

    if args.once {
        return match poller.run_cycle().await {
            Ok(outcome) => {
                match outcome {
                    CycleOutcome::Unchanged { id } => info!(%id, "No new post"),
                    CycleOutcome::Notified { id } => info!(%id, "New post announced"),
                    CycleOutcome::DryRun { id } => info!(%id, "New post printed (dry run)"),
                    CycleOutcome::Recorded { id } => info!(%id, "Cursor recorded"),
                }
                Ok(())
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, "Poll cycle failed");
                Err(e.into())
            }
        };
    }

    tokio::select! {
        () = poller.run() => {}
        () = shutdown_signal() => {}
    }
    warn!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
