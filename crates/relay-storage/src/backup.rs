// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database snapshots via SQLite's online backup API.
//!
//! The backup API produces atomic, consistent copies even while the
//! database is being written to in WAL mode, copying a bounded number of
//! pages per step so a running instance keeps serving.

use std::path::Path;
use std::time::Duration;

use relay_core::RelayError;
use rusqlite::Connection;

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}

/// Copies the database at `db_path` to `backup_path`.
pub fn run_backup(db_path: &str, backup_path: &str) -> Result<(), RelayError> {
    if !Path::new(db_path).exists() {
        return Err(storage_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("database not found: {db_path}"),
        )));
    }

    // Read-only source to minimize impact on a running instance.
    let src = Connection::open_with_flags(
        db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(storage_err)?;
    let mut dst = Connection::open(backup_path).map_err(storage_err)?;

    let backup = rusqlite::backup::Backup::new(&src, &mut dst).map_err(storage_err)?;
    backup
        .run_to_completion(100, Duration::from_millis(10), None)
        .map_err(storage_err)
}

/// Restores the database at `db_path` from `restore_from`, writing a
/// `.pre-restore` safety copy of the current file first.
pub fn run_restore(db_path: &str, restore_from: &str) -> Result<(), RelayError> {
    if !Path::new(restore_from).exists() {
        return Err(storage_err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("backup file not found: {restore_from}"),
        )));
    }

    // Validate the source is a readable SQLite database.
    let test_conn =
        Connection::open_with_flags(restore_from, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(storage_err)?;
    test_conn.execute_batch("SELECT 1").map_err(storage_err)?;
    drop(test_conn);

    if Path::new(db_path).exists() {
        run_backup(db_path, &format!("{db_path}.pre-restore"))?;
    }

    let src =
        Connection::open_with_flags(restore_from, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(storage_err)?;
    let mut dst = Connection::open(db_path).map_err(storage_err)?;
    let backup = rusqlite::backup::Backup::new(&src, &mut dst).map_err(storage_err)?;
    backup
        .run_to_completion(100, Duration::from_millis(10), None)
        .map_err(storage_err)
}
