// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message creation and full-text search.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::types::{Message, Role, SearchHit, SearchQuery};
use relay_core::{ApiError, ErrorCode};
use serde::Deserialize;

use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageCreate {
    pub session_id: String,
    pub role: Role,
    pub content: String,
}

/// `POST /api/messages`
pub async fn create_message(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Json(payload): Json<MessageCreate>,
) -> Result<Json<Message>, ApiFailure> {
    if payload.content.is_empty() {
        return Err(ApiFailure::new(
            ApiError::new(ErrorCode::InvalidQuery, "message content must not be empty"),
            &request_id,
        ));
    }
    state
        .repo
        .get_session(&payload.session_id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| {
            ApiFailure::new(
                ApiError::not_found(ErrorCode::SessionNotFound, "session", &payload.session_id),
                &request_id,
            )
        })?;
    let message = state
        .repo
        .append_message(&payload.session_id, payload.role, &payload.content)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(message))
}

/// `GET /api/messages/search?query=...` — ranked results with `<mark>`
/// highlighted snippets.
pub async fn search_messages(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchHit>>, ApiFailure> {
    let hits = state
        .repo
        .search_messages(query)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(hits))
}
