// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model catalog endpoints: sync from the provider and filtered listing.

use axum::{
    extract::{Query, State},
    Json,
};
use relay_core::types::{ModelFilter, ModelRow};
use relay_core::ApiError;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

/// `POST /api/models/sync` — refresh the catalog from OpenRouter.
///
/// Idempotent with respect to catalog identity: the same external ids
/// produce the same rows.
pub async fn sync_models(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Result<Json<Value>, ApiFailure> {
    if !state.client.has_api_key() {
        return Err(ApiFailure::new(ApiError::missing_api_key(), request_id));
    }
    let models = state
        .client
        .list_models()
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    let synced = state
        .repo
        .sync_models(models)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    info!(request_id = %request_id, synced, "model catalog synced");
    Ok(Json(json!({"synced": synced})))
}

/// `GET /api/models?reasoning&min_context&max_price`
pub async fn list_models(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(filter): Query<ModelFilter>,
) -> Result<Json<Vec<ModelRow>>, ApiFailure> {
    let models = state
        .repo
        .list_models(filter)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(models))
}
