// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD endpoints plus the per-session message listing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use relay_core::types::{Message, Session, SessionDraft, SessionUpdate};
use relay_core::{ApiError, ErrorCode};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

fn default_list_limit() -> i64 {
    50
}

fn session_not_found(id: &str, request_id: &str) -> ApiFailure {
    ApiFailure::new(
        ApiError::not_found(ErrorCode::SessionNotFound, "session", id),
        request_id,
    )
}

/// `POST /api/sessions`
pub async fn create_session(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Json(draft): Json<SessionDraft>,
) -> Result<Json<Session>, ApiFailure> {
    let session = state
        .repo
        .create_session(draft)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(session))
}

/// `GET /api/sessions?limit=N`
pub async fn list_sessions(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Session>>, ApiFailure> {
    let limit = params.limit.clamp(1, 500);
    let sessions = state
        .repo
        .list_sessions(limit)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(sessions))
}

/// `GET /api/sessions/{id}`
pub async fn get_session(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiFailure> {
    let session = state
        .repo
        .get_session(&id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| session_not_found(&id, &request_id))?;
    Ok(Json(session))
}

/// `PATCH /api/sessions/{id}` — partial update of title/profile.
pub async fn update_session(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
    Json(update): Json<SessionUpdate>,
) -> Result<Json<Session>, ApiFailure> {
    let updated = state
        .repo
        .update_session(&id, update)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    if !updated {
        return Err(session_not_found(&id, &request_id));
    }
    let session = state
        .repo
        .get_session(&id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| session_not_found(&id, &request_id))?;
    Ok(Json(session))
}

/// `DELETE /api/sessions/{id}` — cascades to messages and usage rows.
pub async fn delete_session(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiFailure> {
    let deleted = state
        .repo
        .delete_session(&id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    if !deleted {
        return Err(session_not_found(&id, &request_id));
    }
    Ok(Json(json!({"deleted": true, "id": id})))
}

/// `GET /api/sessions/{id}/messages` — ascending by creation time.
pub async fn session_messages(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiFailure> {
    state
        .repo
        .get_session(&id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| session_not_found(&id, &request_id))?;
    let messages = state
        .repo
        .list_messages(&id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(messages))
}
