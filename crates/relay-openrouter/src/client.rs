// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenRouter API.
//!
//! The client is built without an overall request timeout (streams may
//! legitimately last minutes); the pipeline enforces a per-read inactivity
//! budget instead. Dropping a returned stream closes the upstream
//! connection.

use std::pin::Pin;

use futures::Stream;
use relay_config::OpenRouterConfig;
use relay_core::RelayError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::sse::{self, ChatEvent};
use crate::types::{ChatRequest, ModelCatalog};
use relay_core::types::ModelSync;

/// How much of an upstream error body is kept in error messages.
const ERROR_BODY_LIMIT: usize = 512;

/// Client for OpenRouter chat completions and the model catalog.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty())
    }

    fn headers(&self) -> Result<HeaderMap, RelayError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(RelayError::MissingApiKey)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| RelayError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "HTTP-Referer",
            HeaderValue::from_str(&self.config.http_referer)
                .map_err(|e| RelayError::Config(format!("invalid referer header value: {e}")))?,
        );
        headers.insert(
            "X-Title",
            HeaderValue::from_str(&self.config.x_title)
                .map_err(|e| RelayError::Config(format!("invalid title header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Fetches the model catalog, normalized to per-token pricing.
    pub async fn list_models(&self) -> Result<Vec<ModelSync>, RelayError> {
        let url = format!("{}/models", self.config.base_url);
        debug!(url = url.as_str(), "requesting OpenRouter model catalog");
        let response = self
            .http
            .get(&url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| RelayError::Upstream {
                status: None,
                message: format!("OpenRouter /models request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = truncated_body(response).await;
            warn!(status = status.as_u16(), "OpenRouter /models returned non-200");
            return Err(RelayError::Upstream {
                status: Some(status.as_u16()),
                message: format!("OpenRouter /models failed: {body}"),
            });
        }

        let catalog: ModelCatalog = response.json().await.map_err(|e| {
            RelayError::Decode(format!("unparsable /models response: {e}"))
        })?;
        Ok(catalog
            .data
            .into_iter()
            .map(|entry| entry.into_model_sync())
            .collect())
    }

    /// Opens a streaming chat completion and returns the decoded event
    /// stream. Non-2xx responses surface before any event is yielded.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatEvent, RelayError>> + Send>>, RelayError>
    {
        let mut request = request.clone();
        request.stream = true;

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(
            url = url.as_str(),
            model = request.model.as_str(),
            message_count = request.messages.len(),
            "opening OpenRouter stream"
        );
        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Upstream {
                status: None,
                message: format!("OpenRouter stream request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = truncated_body(response).await;
            warn!(status = status.as_u16(), "OpenRouter stream returned non-200");
            return Err(RelayError::Upstream {
                status: Some(status.as_u16()),
                message: format!("OpenRouter stream failed: {body}"),
            });
        }

        Ok(sse::parse_chat_stream(response))
    }
}

async fn truncated_body(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
