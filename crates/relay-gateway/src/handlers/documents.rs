// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document endpoints: upload, listing, content retrieval and deletion.

use std::path::PathBuf;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use relay_core::{ApiError, ErrorCode};
use serde_json::{json, Value};

use crate::documents::{self, DocumentMeta};
use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

fn uploads_root(state: &AppState) -> PathBuf {
    PathBuf::from(&state.config.storage.uploads_dir)
}

/// `POST /api/documents/upload` — multipart upload of one text document.
pub async fn upload_document(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<DocumentMeta>, ApiFailure> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiFailure::new(
            ApiError::new(ErrorCode::FileSaveFailed, format!("unreadable upload: {e}")),
            &request_id,
        )
    })? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| {
            ApiFailure::new(
                ApiError::new(ErrorCode::FileSaveFailed, format!("unreadable upload: {e}")),
                &request_id,
            )
        })?;
        let meta = documents::save_document(&uploads_root(&state), &filename, &bytes)
            .await
            .map_err(|e| ApiFailure::new(e, &request_id))?;
        return Ok(Json(meta));
    }
    Err(ApiFailure::new(
        ApiError::new(ErrorCode::MissingFilename, "No filename provided"),
        &request_id,
    ))
}

/// `GET /api/documents`
pub async fn list_documents(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Result<Json<Vec<DocumentMeta>>, ApiFailure> {
    let docs = documents::list_documents(&uploads_root(&state))
        .await
        .map_err(|e| ApiFailure::new(e, &request_id))?;
    Ok(Json(docs))
}

/// `GET /api/documents/{id}` — metadata plus text content.
pub async fn get_document(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let (meta, content) = documents::load_document(&uploads_root(&state), &id)
        .await
        .map_err(|e| ApiFailure::new(e, &request_id))?;
    Ok(Json(json!({
        "id": meta.id,
        "name": meta.name,
        "size": meta.size,
        "created_at": meta.created_at,
        "content": content,
    })))
}

/// `DELETE /api/documents/{id}`
pub async fn delete_document(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    documents::delete_document(&uploads_root(&state), &id)
        .await
        .map_err(|e| ApiFailure::new(e, &request_id))?;
    Ok(Json(json!({"deleted": true, "id": id})))
}
