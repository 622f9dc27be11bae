// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router assembly and server lifecycle.
//!
//! Per-endpoint-group rate limit layers wrap the route groups; the
//! request-ID middleware wraps everything so every response carries
//! `X-Request-ID` and every log line the id.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use relay_core::RelayError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::handlers;
use crate::ratelimit::{rate_limit_middleware, EndpointLimit, RatePolicy};
use crate::request_id::request_id_middleware;
use crate::stream::stream_handler;
use crate::AppState;

/// The nine endpoint-group policies, parsed once at startup. A malformed
/// policy string aborts startup.
struct Policies {
    stream: RatePolicy,
    model_sync: RatePolicy,
    upload: RatePolicy,
    sessions: RatePolicy,
    messages: RatePolicy,
    profiles: RatePolicy,
    models_list: RatePolicy,
    usage_logs: RatePolicy,
    health_check: RatePolicy,
}

impl Policies {
    fn parse(config: &relay_config::RateLimitConfig) -> Result<Self, RelayError> {
        Ok(Self {
            stream: RatePolicy::parse(&config.stream)?,
            model_sync: RatePolicy::parse(&config.model_sync)?,
            upload: RatePolicy::parse(&config.upload)?,
            sessions: RatePolicy::parse(&config.sessions)?,
            messages: RatePolicy::parse(&config.messages)?,
            profiles: RatePolicy::parse(&config.profiles)?,
            models_list: RatePolicy::parse(&config.models_list)?,
            usage_logs: RatePolicy::parse(&config.usage_logs)?,
            health_check: RatePolicy::parse(&config.health_check)?,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Builds the full API router.
pub fn build_router(state: AppState) -> Result<Router, RelayError> {
    let policies = Policies::parse(&state.config.ratelimit)?;

    let limit = |name: &'static str, policy: RatePolicy| EndpointLimit {
        name,
        policy: Arc::new(policy),
        limiter: state.limiter.clone(),
    };
    let limited = |limit: EndpointLimit| {
        middleware::from_fn_with_state(limit, rate_limit_middleware)
    };

    let health_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route_layer(limited(limit("health_check", policies.health_check)));

    let model_sync_routes = Router::new()
        .route("/models/sync", post(handlers::models::sync_models))
        .route_layer(limited(limit("model_sync", policies.model_sync)));

    let models_routes = Router::new()
        .route("/models", get(handlers::models::list_models))
        .route_layer(limited(limit("models_list", policies.models_list)));

    let profile_routes = Router::new()
        .route(
            "/profiles",
            post(handlers::profiles::create_profile).get(handlers::profiles::list_profiles),
        )
        .route(
            "/profiles/{id}",
            get(handlers::profiles::get_profile)
                .put(handlers::profiles::update_profile)
                .delete(handlers::profiles::delete_profile),
        )
        .route_layer(limited(limit("profiles", policies.profiles)));

    let session_routes = Router::new()
        .route(
            "/sessions",
            post(handlers::sessions::create_session).get(handlers::sessions::list_sessions),
        )
        .route(
            "/sessions/{id}",
            get(handlers::sessions::get_session)
                .patch(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        )
        .route(
            "/sessions/{id}/messages",
            get(handlers::sessions::session_messages),
        )
        .route_layer(limited(limit("sessions", policies.sessions)));

    let message_routes = Router::new()
        .route("/messages", post(handlers::messages::create_message))
        .route("/messages/search", get(handlers::messages::search_messages))
        .route_layer(limited(limit("messages", policies.messages)));

    let upload_routes = Router::new()
        .route("/documents/upload", post(handlers::documents::upload_document))
        .route_layer(limited(limit("upload", policies.upload)));

    let document_routes = Router::new()
        .route("/documents", get(handlers::documents::list_documents))
        .route(
            "/documents/{id}",
            get(handlers::documents::get_document).delete(handlers::documents::delete_document),
        );

    let usage_routes = Router::new()
        .route("/usage", post(handlers::usage::create_usage_log))
        .route("/usage/sessions/{id}", get(handlers::usage::usage_by_session))
        .route("/usage/models", get(handlers::usage::usage_by_model))
        .route("/usage/summary", get(handlers::usage::usage_summary))
        .route("/usage/stats", get(handlers::usage::usage_stats))
        .route_layer(limited(limit("usage_logs", policies.usage_logs)));

    let stream_routes = Router::new()
        .route("/stream", get(stream_handler))
        .route_layer(limited(limit("stream", policies.stream)));

    let cache_routes = Router::new()
        .route("/cache/stats", get(handlers::cache::cache_stats))
        .route("/cache/clear", post(handlers::cache::clear_caches));

    let admin_routes = Router::new()
        .route("/admin/backup", get(handlers::admin::download_backup))
        .route("/admin/backups", get(handlers::admin::list_backups));

    let api = Router::new()
        .merge(health_routes)
        .merge(model_sync_routes)
        .merge(models_routes)
        .merge(profile_routes)
        .merge(session_routes)
        .merge(message_routes)
        .merge(upload_routes)
        .merge(document_routes)
        .merge(usage_routes)
        .merge(stream_routes)
        .merge(cache_routes)
        .merge(admin_routes);

    let origins = state.config.server.origins();
    Ok(Router::new()
        .nest("/api", api)
        .layer(cors_layer(&origins))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state))
}

/// Binds and serves until the cancellation token fires.
pub async fn start_server(state: AppState, cancel: CancellationToken) -> Result<(), RelayError> {
    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let app = build_router(state)?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Config(format!("failed to bind {addr}: {e}")))?;

    info!(addr = addr.as_str(), "relay gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await
    .map_err(|e| RelayError::Internal(format!("server error: {e}")))
}
