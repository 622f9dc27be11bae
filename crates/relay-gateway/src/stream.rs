// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The streaming pipeline: one instance per in-flight request.
//!
//! Preflight resolves session, profile and effective parameters into a
//! [`StreamPlan`] or a typed error; the run phase relays upstream deltas as
//! `token` frames and persists the outcome. Preflight failures are emitted
//! as a single SSE `error` frame with status 200 — browser `EventSource`
//! surfaces non-2xx statuses as opaque connection failures, so the error
//! must travel inside the stream body.
//!
//! Frame contract: zero or one `start`, zero or more `token`, exactly one
//! terminal (`done` or `error`). Nothing is persisted unless the upstream
//! stream completes; a dropped client cancels the upstream read and exits
//! without writes.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use relay_core::types::compose_model_id;
use relay_core::{ApiError, ErrorCode, RelayError, Role, TokenUsage};
use relay_openrouter::{ChatEvent, ChatMessage, ChatRequest};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::request_id::RequestId;
use crate::sse::{frame_bytes, EVENT_DONE, EVENT_ERROR, EVENT_START, EVENT_TOKEN};
use crate::AppState;

/// Query parameters of `GET /api/stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamParams {
    pub session_id: String,
    pub model_id: String,
    #[serde(default)]
    pub profile_id: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

/// Everything preflight resolved for one stream.
#[derive(Debug, Clone)]
pub struct StreamPlan {
    pub session_id: String,
    /// Effective model id, preset suffix included.
    pub model_id: String,
    pub profile_id: Option<i64>,
    pub temperature: f64,
    pub max_tokens: i64,
    pub messages: Vec<ChatMessage>,
}

/// Resolves a stream request into a plan or the typed error to emit.
///
/// An explicit `profile_id` wins over the session's stored default; when
/// both are absent no profile is used.
pub async fn preflight(state: &AppState, params: &StreamParams) -> Result<StreamPlan, ApiError> {
    if !state.client.has_api_key() {
        return Err(ApiError::missing_api_key());
    }

    let session = state
        .repo
        .get_session(&params.session_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::not_found(ErrorCode::SessionNotFound, "session", &params.session_id)
        })?;

    let profile_ref = params.profile_id.or(session.profile_id);
    let profile = match profile_ref {
        Some(id) => Some(
            state
                .repo
                .get_profile(id)
                .await
                .map_err(ApiError::from)?
                .ok_or_else(|| {
                    ApiError::not_found(ErrorCode::ProfileNotFound, "profile", id.to_string())
                })?,
        ),
        None => None,
    };

    let temperature = params
        .temperature
        .or(profile.as_ref().map(|p| p.temperature))
        .unwrap_or(0.7);
    let max_tokens = params
        .max_tokens
        .or(profile.as_ref().map(|p| p.max_tokens))
        .unwrap_or(2048);
    let model_id = compose_model_id(
        &params.model_id,
        profile.as_ref().and_then(|p| p.preset.as_deref()),
    );

    let history = state
        .repo
        .list_messages(&session.id)
        .await
        .map_err(ApiError::from)?;

    let mut messages = Vec::with_capacity(history.len() + 1);
    // The synthetic system turn is sent upstream but never persisted.
    if let Some(system_prompt) = profile
        .as_ref()
        .and_then(|p| p.system_prompt.as_deref())
        .filter(|sp| !sp.trim().is_empty())
    {
        messages.push(ChatMessage {
            role: Role::System,
            content: system_prompt.to_string(),
        });
    }
    messages.extend(history.into_iter().map(|m| ChatMessage {
        role: m.role,
        content: m.content,
    }));

    Ok(StreamPlan {
        session_id: session.id,
        model_id,
        profile_id: profile.as_ref().map(|p| p.id),
        temperature,
        max_tokens,
        messages,
    })
}

/// `GET /api/stream` — always 200 with `text/event-stream`; every failure
/// mode is an in-band `error` frame.
pub async fn stream_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    Query(params): Query<StreamParams>,
) -> Response {
    let plan = preflight(&state, &params).await;
    let frames = run_stream(state, request_id, plan);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(
            frames.map(Ok::<_, std::convert::Infallible>),
        ))
        .expect("static response parts are valid")
}

/// Logs a cancellation if the frame stream is dropped before a terminal
/// frame went out (client disconnect or inactivity on the socket).
struct CancelGuard {
    request_id: String,
    session_id: String,
    finished: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.finished {
            info!(
                request_id = %self.request_id,
                session_id = %self.session_id,
                "stream cancelled before completion, nothing persisted"
            );
        }
    }
}

fn error_frame(err: &ApiError, request_id: &str) -> Bytes {
    let payload = serde_json::to_value(err.sse_envelope(request_id))
        .unwrap_or_else(|_| json!({"error_code": "STREAM_ERROR"}));
    frame_bytes(EVENT_ERROR, &payload)
}

/// The frame generator. Dropping the returned stream drops the upstream
/// connection with it.
fn run_stream(
    state: AppState,
    request_id: String,
    plan: Result<StreamPlan, ApiError>,
) -> impl Stream<Item = Bytes> {
    async_stream::stream! {
        let plan = match plan {
            Ok(plan) => plan,
            Err(err) => {
                warn!(request_id = %request_id, code = err.code.as_str(), "stream preflight failed");
                yield error_frame(&err, &request_id);
                return;
            }
        };

        let mut guard = CancelGuard {
            request_id: request_id.clone(),
            session_id: plan.session_id.clone(),
            finished: false,
        };

        yield frame_bytes(
            EVENT_START,
            &json!({"session_id": plan.session_id, "model_id": plan.model_id}),
        );

        let request = ChatRequest {
            model: plan.model_id.clone(),
            messages: plan.messages.clone(),
            stream: true,
            temperature: plan.temperature,
            max_tokens: plan.max_tokens,
        };
        let mut upstream = match state.client.stream_chat(&request).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(request_id = %request_id, error = %err, "failed to open upstream stream");
                guard.finished = true;
                yield error_frame(&ApiError::from(err), &request_id);
                return;
            }
        };

        let read_timeout = Duration::from_secs(state.config.openrouter.read_timeout_secs);
        let mut assistant = String::new();
        let mut usage: Option<TokenUsage> = None;

        loop {
            match tokio::time::timeout(read_timeout, upstream.next()).await {
                Err(_) => {
                    error!(
                        request_id = %request_id,
                        session_id = %plan.session_id,
                        timeout_secs = read_timeout.as_secs(),
                        "upstream read exceeded inactivity deadline"
                    );
                    guard.finished = true;
                    yield error_frame(
                        &ApiError::from(RelayError::Timeout { duration: read_timeout }),
                        &request_id,
                    );
                    return;
                }
                Ok(None) => break,
                Ok(Some(Ok(ChatEvent::Done))) => break,
                Ok(Some(Ok(ChatEvent::Delta { content, usage: snapshot }))) => {
                    if let Some(snapshot) = snapshot {
                        usage = Some(snapshot);
                    }
                    if !content.is_empty() {
                        assistant.push_str(&content);
                        yield frame_bytes(EVENT_TOKEN, &json!({"token": content}));
                    }
                }
                Ok(Some(Err(err))) => {
                    error!(
                        request_id = %request_id,
                        session_id = %plan.session_id,
                        error = %err,
                        "upstream error mid-stream, partial output discarded"
                    );
                    guard.finished = true;
                    yield error_frame(&ApiError::from(err), &request_id);
                    return;
                }
            }
        }
        drop(upstream);

        match persist_completion(&state, &plan, &assistant, usage).await {
            Ok(()) => {
                guard.finished = true;
                yield frame_bytes(EVENT_DONE, &json!({"assistant": assistant, "usage": usage}));
            }
            Err(err) => {
                error!(
                    request_id = %request_id,
                    session_id = %plan.session_id,
                    error = %err,
                    "failed to persist completed stream"
                );
                guard.finished = true;
                yield error_frame(&ApiError::from(err), &request_id);
            }
        }
    }
}

/// Writes the completed stream's rows: one assistant message, then at most
/// one usage row (only when the provider reported counters).
async fn persist_completion(
    state: &AppState,
    plan: &StreamPlan,
    assistant: &str,
    usage: Option<TokenUsage>,
) -> Result<(), RelayError> {
    state
        .repo
        .append_message(&plan.session_id, Role::Assistant, assistant)
        .await?;
    if let Some(usage) = usage {
        state
            .repo
            .insert_usage(relay_core::types::UsageDraft {
                session_id: plan.session_id.clone(),
                model_id: Some(plan.model_id.clone()),
                profile_id: plan.profile_id,
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            })
            .await?;
    }
    Ok(())
}
