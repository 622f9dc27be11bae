// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting endpoints: append, per-session listing, per-model
//! breakdown, timeline and overall stats.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use relay_core::types::{
    ModelUsage, UsageDraft, UsageGroup, UsageLog, UsagePeriod, UsageStats,
};
use relay_core::{ApiError, ErrorCode};
use serde::Deserialize;

use crate::error::ApiFailure;
use crate::request_id::RequestId;
use crate::AppState;

/// `POST /api/usage`
pub async fn create_usage_log(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Json(draft): Json<UsageDraft>,
) -> Result<(StatusCode, Json<UsageLog>), ApiFailure> {
    state
        .repo
        .get_session(&draft.session_id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?
        .ok_or_else(|| {
            ApiFailure::new(
                ApiError::not_found(ErrorCode::SessionNotFound, "session", &draft.session_id),
                &request_id,
            )
        })?;
    let log = state
        .repo
        .insert_usage(draft)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// `GET /api/usage/sessions/{id}`
pub async fn usage_by_session(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<UsageLog>>, ApiFailure> {
    let logs = state
        .repo
        .list_usage_for_session(&session_id)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(logs))
}

/// `GET /api/usage/models`
pub async fn usage_by_model(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Result<Json<Vec<ModelUsage>>, ApiFailure> {
    let breakdown = state
        .repo
        .usage_by_model()
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(breakdown))
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default = "default_group")]
    pub group_by: UsageGroup,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

fn default_group() -> UsageGroup {
    UsageGroup::Day
}

/// `GET /api/usage/summary?group_by=day|week|month&start_date&end_date`
pub async fn usage_summary(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(params): Query<SummaryParams>,
) -> Result<Json<Vec<UsagePeriod>>, ApiFailure> {
    let timeline = state
        .repo
        .usage_timeline(params.group_by, params.start_date, params.end_date)
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(timeline))
}

/// `GET /api/usage/stats`
pub async fn usage_stats(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
) -> Result<Json<UsageStats>, ApiFailure> {
    let stats = state
        .repo
        .usage_stats()
        .await
        .map_err(|e| ApiFailure::from_relay(e, &request_id))?;
    Ok(Json(stats))
}
