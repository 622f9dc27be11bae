// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `relay serve` command implementation.
//!
//! Wires configuration, storage (migrations run on open; any failure
//! aborts startup), the OpenRouter client and the gateway, then serves
//! until ctrl-c.

use relay_config::RelayConfig;
use relay_core::RelayError;
use relay_gateway::{server, AppState};
use relay_openrouter::OpenRouterClient;
use relay_storage::{Database, Repository};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the gateway until a shutdown signal arrives.
pub async fn run_serve(config: RelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.server.log_level);

    info!("starting relay serve");

    for dir in [&config.storage.uploads_dir, &config.storage.backups_dir] {
        std::fs::create_dir_all(dir).map_err(|e| {
            RelayError::Config(format!("cannot create directory {dir}: {e}"))
        })?;
    }

    let db = Database::open(&config.storage.db_path).await?;
    let repo = Repository::new(db);
    let client = OpenRouterClient::new(config.openrouter.clone())?;
    if !client.has_api_key() {
        warn!("OPENROUTER_API_KEY is not set; stream requests will fail with MISSING_API_KEY");
    }

    let state = AppState::new(repo, client, config);
    let cancel = install_signal_handler();

    server::start_server(state, cancel).await?;

    info!("relay serve shutdown complete");
    Ok(())
}

/// Returns a token cancelled on ctrl-c.
fn install_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handler = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            handler.cancel();
        }
    });
    cancel
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("relay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
