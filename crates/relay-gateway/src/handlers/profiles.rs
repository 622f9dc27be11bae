// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile CRUD endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use relay_core::types::{Profile, ProfileDraft};
use relay_core::{ApiError, ErrorCode};
use serde_json::{json, Value};

use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

fn validate(draft: &ProfileDraft, request_id: &str) -> Result<(), ApiFailure> {
    if draft.name.trim().is_empty() {
        return Err(ApiFailure::new(
            ApiError::new(ErrorCode::InvalidQuery, "profile name must not be empty"),
            request_id,
        ));
    }
    if draft.max_tokens < 1 {
        return Err(ApiFailure::new(
            ApiError::new(ErrorCode::InvalidQuery, "max_tokens must be positive"),
            request_id,
        ));
    }
    Ok(())
}

/// `POST /api/profiles`
pub async fn create_profile(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<Profile>, ApiFailure> {
    validate(&draft, &request_id)?;
    let profile = state
        .repo
        .create_profile(draft)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(profile))
}

/// `GET /api/profiles`
pub async fn list_profiles(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Result<Json<Vec<Profile>>, ApiFailure> {
    let profiles = state
        .repo
        .list_profiles()
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(profiles))
}

/// `GET /api/profiles/{id}`
pub async fn get_profile(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<i64>,
) -> Result<Json<Profile>, ApiFailure> {
    let profile = state
        .repo
        .get_profile(id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| {
            ApiFailure::new(
                ApiError::not_found(ErrorCode::ProfileNotFound, "profile", id.to_string()),
                &request_id,
            )
        })?;
    Ok(Json(profile))
}

/// `PUT /api/profiles/{id}`
pub async fn update_profile(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<i64>,
    Json(draft): Json<ProfileDraft>,
) -> Result<Json<Profile>, ApiFailure> {
    validate(&draft, &request_id)?;
    let updated = state
        .repo
        .update_profile(id, draft)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    if !updated {
        return Err(ApiFailure::new(
            ApiError::not_found(ErrorCode::ProfileNotFound, "profile", id.to_string()),
            &request_id,
        ));
    }
    let profile = state
        .repo
        .get_profile(id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| {
            ApiFailure::new(
                ApiError::not_found(ErrorCode::ProfileNotFound, "profile", id.to_string()),
                &request_id,
            )
        })?;
    Ok(Json(profile))
}

/// `DELETE /api/profiles/{id}`
pub async fn delete_profile(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    let deleted = state
        .repo
        .delete_profile(id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    if !deleted {
        return Err(ApiFailure::new(
            ApiError::not_found(ErrorCode::ProfileNotFound, "profile", id.to_string()),
            &request_id,
        ));
    }
    Ok(Json(json!({"deleted": true, "id": id})))
}
