// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the relay service.
//!
//! Routes requests through request-ID and rate-limit middleware, validates
//! inputs, and translates repository and pipeline errors into the canonical
//! envelope. The streaming endpoint relays OpenRouter completions to the
//! browser as SSE frames.

pub mod documents;
pub mod error;
pub mod handlers;
pub mod ratelimit;
pub mod request_id;
pub mod server;
pub mod sse;
pub mod stream;

use std::sync::Arc;

use relay_config::RelayConfig;
use relay_openrouter::OpenRouterClient;
use relay_storage::Repository;

use crate::ratelimit::RateLimiter;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub client: Arc<OpenRouterClient>,
    pub config: Arc<RelayConfig>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(repo: Repository, client: OpenRouterClient, config: RelayConfig) -> Self {
        let limiter = RateLimiter::new(config.ratelimit.enabled);
        Self {
            repo: Arc::new(repo),
            client: Arc::new(client),
            config: Arc::new(config),
            limiter: Arc::new(limiter),
        }
    }
}
