// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and catalog types for the OpenRouter chat-completions API.

use relay_core::types::{ModelSync, Role};
use serde::{Deserialize, Serialize};

/// One turn in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// A streaming chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f64,
    pub max_tokens: i64,
}

/// Response shape of `GET /models`.
#[derive(Debug, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub data: Vec<CatalogEntry>,
}

/// One entry of the provider catalog. Pricing comes over the wire as
/// decimal strings in dollars per token.
#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub context_length: Option<i64>,
    #[serde(default)]
    pub pricing: Option<CatalogPricing>,
    #[serde(default)]
    pub supported_parameters: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogPricing {
    #[serde(default)]
    pub prompt: Option<serde_json::Value>,
    #[serde(default)]
    pub completion: Option<serde_json::Value>,
}

/// Accepts both string and numeric price renderings; anything else reads
/// as unknown.
fn price_to_f64(value: Option<&serde_json::Value>) -> Option<f64> {
    match value {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

impl CatalogEntry {
    /// Normalizes a catalog entry to the store's per-token pricing unit.
    pub fn into_model_sync(self) -> ModelSync {
        let pricing_prompt = self
            .pricing
            .as_ref()
            .and_then(|p| price_to_f64(p.prompt.as_ref()));
        let pricing_completion = self
            .pricing
            .as_ref()
            .and_then(|p| price_to_f64(p.completion.as_ref()));
        let is_reasoning = self
            .supported_parameters
            .as_ref()
            .map(|params| params.iter().any(|p| p == "reasoning" || p == "include_reasoning"))
            .unwrap_or(false);
        ModelSync {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            context_length: self.context_length,
            pricing_prompt,
            pricing_completion,
            is_reasoning,
        }
    }
}
