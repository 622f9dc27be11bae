// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay - a local-first gateway that multiplexes a browser UI onto
//! OpenRouter while keeping the provider API key server-side.

mod serve;

use clap::{Parser, Subcommand};

/// Relay - local-first OpenRouter streaming gateway.
#[derive(Parser, Debug)]
#[command(name = "relay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway server.
    Serve,
    /// Snapshot the database to a backup file.
    Backup {
        /// Destination path for the backup file.
        output: Option<String>,
    },
    /// Restore the database from a backup file.
    Restore {
        /// Backup file to restore from.
        source: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match relay_config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Backup { output } => {
            let output = output.unwrap_or_else(|| {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
                format!("{}/relay_backup_{timestamp}.db", config.storage.backups_dir)
            });
            if let Some(parent) = std::path::Path::new(&output).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            relay_storage::backup::run_backup(&config.storage.db_path, &output)
                .map(|()| eprintln!("Backup written to {output}"))
        }
        Commands::Restore { source } => {
            relay_storage::backup::run_restore(&config.storage.db_path, &source)
                .map(|()| eprintln!("Database restored from {source}"))
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
