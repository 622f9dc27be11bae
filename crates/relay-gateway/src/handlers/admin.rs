// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin endpoints: database snapshots in the backups directory.

use std::path::PathBuf;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_core::RelayError;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

const BACKUP_PREFIX: &str = "relay_backup_";

fn backups_root(state: &AppState) -> PathBuf {
    PathBuf::from(&state.config.storage.backups_dir)
}

/// `GET /api/admin/backup` — snapshot the database into the backups
/// directory and return it as a download.
pub async fn download_backup(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Result<Response, ApiFailure> {
    let backups_dir = backups_root(&state);
    tokio::fs::create_dir_all(&backups_dir).await.map_err(|e| {
        ApiFailure::from_relay(
            RelayError::Storage { source: Box::new(e) },
            &request_id,
        )
    })?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let backup_name = format!("{BACKUP_PREFIX}{timestamp}.db");
    let backup_path = backups_dir.join(&backup_name);

    let db_path = state.config.storage.db_path.clone();
    let backup_path_str = backup_path.to_string_lossy().into_owned();
    tokio::task::spawn_blocking(move || {
        relay_storage::backup::run_backup(&db_path, &backup_path_str)
    })
    .await
    .map_err(|e| {
        ApiFailure::from_relay(RelayError::Internal(format!("backup task failed: {e}")), &request_id)
    })?
    .map_err(|e| ApiFailure::from_relay(e, &request_id))?;

    let bytes = tokio::fs::read(&backup_path).await.map_err(|e| {
        ApiFailure::from_relay(
            RelayError::Storage { source: Box::new(e) },
            &request_id,
        )
    })?;

    info!(
        request_id = %request_id,
        backup = backup_name.as_str(),
        size = bytes.len(),
        "backup created"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/x-sqlite3".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{backup_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /api/admin/backups` — list available snapshots, newest first.
pub async fn list_backups(State(state): State<AppState>) -> Result<Json<Value>, ApiFailure> {
    let backups_dir = backups_root(&state);
    let mut backups = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(&backups_dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(BACKUP_PREFIX) || !name.ends_with(".db") {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            let modified = metadata
                .modified()
                .map(|m| {
                    chrono::DateTime::<chrono::Utc>::from(m)
                        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                        .to_string()
                })
                .unwrap_or_default();
            backups.push(json!({
                "filename": name,
                "size_bytes": metadata.len(),
                "modified_at": modified,
            }));
        }
    }
    backups.sort_by(|a, b| {
        b["filename"]
            .as_str()
            .unwrap_or_default()
            .cmp(a["filename"].as_str().unwrap_or_default())
    });
    Ok(Json(json!({
        "backups": backups,
        "total": backups.len(),
    })))
}
