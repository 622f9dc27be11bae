// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and
//! migrations applied on open.
//!
//! All access is serialized through tokio-rusqlite's single background
//! thread. Foreign keys are enabled on the connection before anything else
//! touches it; a migration failure fails `open`, which aborts startup.

use std::path::Path;

use relay_core::RelayError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the relay SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path`, enables WAL and
    /// foreign keys, and applies pending migrations.
    pub async fn open(path: &str) -> Result<Self, RelayError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RelayError::Storage {
                    source: Box::new(e),
                })?;
            }
        }
        let conn = Connection::open(path).await.map_err(map_tr_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            init_connection(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Opens an in-memory database with the full schema. Test-only helper
    /// exposed publicly so downstream crates can use it in their tests.
    pub async fn open_in_memory() -> Result<Self, RelayError> {
        let conn = Connection::open_in_memory().await.map_err(map_tr_err)?;
        conn.call(|conn| {
            init_connection(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn init_connection(conn: &mut rusqlite::Connection) -> Result<(), tokio_rusqlite::Error> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    let applied = migrations::apply_all(conn)?;
    if applied > 0 {
        debug!(applied, "migrations applied");
    }
    Ok(())
}

/// Converts tokio-rusqlite errors into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}
