// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache monitoring and invalidation endpoints.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// `GET /api/cache/stats`
pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"caches": state.repo.cache_stats()}))
}

/// `POST /api/cache/clear` — drop all cached entries after manual
/// database changes.
pub async fn clear_caches(State(state): State<AppState>) -> Json<Value> {
    state.repo.clear_caches();
    Json(json!({"cleared": ["profiles", "models"]}))
}
