//! get-motivated
//!
//! Single-binary poller that:
//! 1. Authenticates to Reddit with the OAuth2 password grant (token cached on disk)
//! 2. Fetches a random post from the configured subreddit
//! 3. Opens the post's URL in the default browser
//! 4. Sleeps 2-4 hours and repeats, stopping after 3 failures in a row

mod browser;
mod config;
mod error;
mod fetcher;
mod logging;
mod poller;

use anyhow::{Context, Result};
use reddit_auth::{TokenCache, TokenProvider};
use tokio::sync::watch;
use tracing::{Instrument, info};

use crate::browser::SystemBrowser;
use crate::config::Config;
use crate::fetcher::ContentFetcher;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let _log_guard = logging::init(&config.app.log_file)?;

    run(config).instrument(logging::process_span()).await
}

async fn run(config: Config) -> Result<()> {
    info!(
        username = %config.reddit.username,
        subreddit = %config.reddit.subreddit,
        token_cache = %config.app.token_cache.display(),
        log_file = %config.app.log_file.display(),
        "configuration loaded"
    );

    let cache = TokenCache::new(&config.app.token_cache);
    cache
        .ensure_parent_dir()
        .await
        .context("failed to create token cache directory")?;

    let client = reqwest::Client::new();
    let tokens = TokenProvider::new(
        client.clone(),
        &config.reddit.token_url,
        &config.reddit.user_agent,
        config.credentials()?,
        cache,
    );
    let fetcher = ContentFetcher::new(
        tokens,
        client,
        &config.reddit.api_base,
        &config.reddit.subreddit,
        SystemBrowser,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(
        async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        }
        .in_current_span(),
    );

    let interval = config.poll.interval();
    info!(
        min_secs = interval.min().as_secs(),
        max_secs = interval.max().as_secs(),
        "starting poll loop"
    );
    poller::run(&fetcher, interval, stop_rx).await?;

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, stopping after current iteration"),
        _ = terminate => info!("received SIGTERM, stopping after current iteration"),
    }
}
