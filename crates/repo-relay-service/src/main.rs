//! # Repo-Relay Service
//!
//! Binary entry point for the relay service.
//!
//! This executable:
//! - Loads configuration from environment and files
//! - Initializes logging
//! - Wires the store, formatter, sink, and dispatch engine
//! - Starts the HTTP server from repo-relay-api and the polling loop
//!
//! Both ingestion paths share one dispatch engine and one subscription
//! store; shutdown is coordinated through a single watch channel so the
//! server drains and the poller stops on the same signal.

mod config;
mod github_source;
mod telegram;

use config::RelayConfig;
use github_source::GithubEventsSource;
use repo_relay_api::{start_server, AppState};
use repo_relay_core::{
    DispatchEngine, GithubEventFormatter, InMemorySubscriptionStore, Poller, PollerConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use telegram::TelegramSink;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "repo_relay_service=info,repo_relay_api=info,repo_relay_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Repo-Relay Service");

    let relay_config = match RelayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to build configuration; aborting");
            std::process::exit(3);
        }
    };

    if let Err(e) = relay_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    // -------------------------------------------------------------------------
    // Wire components
    //
    // One store and one engine are shared by the webhook handler, the poller,
    // and the sink's identity bookkeeping.
    // -------------------------------------------------------------------------
    let store = Arc::new(InMemorySubscriptionStore::with_identity_retention(
        chrono::Duration::seconds(relay_config.storage.identity_retention_seconds),
    ));

    let http_client = reqwest::Client::new();

    let sink = Arc::new(TelegramSink::new(
        http_client.clone(),
        relay_config.telegram.api_base.clone(),
        relay_config.telegram.bot_token.clone(),
        store.clone(),
    ));

    let engine = Arc::new(DispatchEngine::new(
        store.clone(),
        sink,
        Arc::new(GithubEventFormatter::new()),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // -------------------------------------------------------------------------
    // Polling path
    // -------------------------------------------------------------------------
    let poller_handle = if relay_config.polling.enabled {
        let source = Arc::new(GithubEventsSource::new(
            http_client,
            relay_config.github.api_base.clone(),
            relay_config.github.token.clone(),
        ));
        let poller = Poller::new(
            PollerConfig {
                interval: std::time::Duration::from_secs(relay_config.polling.interval_seconds),
            },
            store,
            engine.clone(),
            source,
        );
        let poller_shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            poller.run(poller_shutdown).await;
        }))
    } else {
        info!("Polling path disabled by configuration");
        None
    };

    // -------------------------------------------------------------------------
    // Signal handling
    // -------------------------------------------------------------------------
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
            _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
        }

        let _ = shutdown_tx.send(true);
    });

    // -------------------------------------------------------------------------
    // Webhook path (blocks until shutdown)
    // -------------------------------------------------------------------------
    let addr: SocketAddr = format!(
        "{}:{}",
        relay_config.server.host, relay_config.server.port
    )
    .parse()?;

    let state = AppState::new(engine, relay_config.webhook.secret.clone());
    start_server(addr, state, shutdown_rx).await?;

    if let Some(handle) = poller_handle {
        let _ = handle.await;
    }

    info!("Repo-Relay Service shutdown complete");
    Ok(())
}
