// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the relay workspace.
//!
//! Every boundary (repository return, cache value, pipeline input) is an
//! explicit record with named fields; role and session type are validated
//! enums, never raw strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Message role within a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// The kind of conversation a session holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Chat,
    Code,
    Documents,
    Playground,
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Chat
    }
}

/// A catalog row synced from the provider. `id` is the stable external
/// OpenRouter identifier; unit prices are dollars per token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRow {
    pub id: String,
    pub name: String,
    pub context_length: Option<i64>,
    pub pricing_prompt: Option<f64>,
    pub pricing_completion: Option<f64>,
    pub is_reasoning: bool,
    pub created_at: String,
}

/// Catalog entry as ingested by a sync; timestamps are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSync {
    pub id: String,
    pub name: String,
    pub context_length: Option<i64>,
    pub pricing_prompt: Option<f64>,
    pub pricing_completion: Option<f64>,
    pub is_reasoning: bool,
}

/// Filters for listing the model catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelFilter {
    pub reasoning: Option<bool>,
    pub min_context: Option<i64>,
    pub max_price: Option<f64>,
}

/// A reusable preset applied to streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub max_tokens: i64,
    pub preset: Option<String>,
    pub created_at: String,
}

/// Fields accepted when creating or replacing a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
    #[serde(default)]
    pub preset: Option<String>,
}

pub fn default_temperature() -> f64 {
    0.7
}

pub fn default_max_tokens() -> i64 {
    2048
}

/// A conversation container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub session_type: SessionType,
    pub title: Option<String>,
    pub profile_id: Option<i64>,
    pub created_at: String,
}

/// Fields accepted when creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDraft {
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub profile_id: Option<i64>,
}

/// Partial session update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub profile_id: Option<i64>,
}

/// A single message within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

/// Token counts reported by the provider for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// One usage-accounting row, appended once per successful stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: String,
    pub session_id: String,
    pub profile_id: Option<i64>,
    pub model_id: Option<String>,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
    pub created_at: String,
}

/// Fields accepted when appending a usage row; cost is computed by the
/// repository from catalog unit prices.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageDraft {
    pub session_id: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<i64>,
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
}

/// Full-text search parameters. `limit` is clamped to 200 and `offset`
/// floored at 0 by the repository.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub fn default_search_limit() -> i64 {
    50
}

/// One ranked search result. `rank` is the raw BM25 score (more negative is
/// more relevant); `snippet` carries inline `<mark>` highlight markers.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: String,
    pub session_type: SessionType,
    pub session_title: Option<String>,
    pub snippet: String,
    pub rank: f64,
}

/// Usage aggregated over one calendar period.
#[derive(Debug, Clone, Serialize)]
pub struct UsagePeriod {
    pub period: String,
    pub total_tokens: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub cost_usd: f64,
    pub requests: i64,
}

/// Grouping granularity for the usage timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UsageGroup {
    Day,
    Week,
    Month,
}

impl UsageGroup {
    /// The strftime pattern that buckets timestamps into this period.
    pub fn strftime_pattern(&self) -> &'static str {
        match self {
            UsageGroup::Day => "%Y-%m-%d",
            UsageGroup::Week => "%Y-W%W",
            UsageGroup::Month => "%Y-%m",
        }
    }
}

/// Usage aggregated per model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelUsage {
    pub model_id: Option<String>,
    pub model_name: Option<String>,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cost_usd: f64,
}

/// Overall usage statistics.
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub total_requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub total_cost_usd: f64,
    pub unique_models: i64,
    pub unique_sessions: i64,
    pub avg_cost_per_request: f64,
    pub first_request_at: Option<String>,
    pub last_request_at: Option<String>,
}

/// Composes the effective model id from a base id and an optional profile
/// preset label. The wire form of a preset is `@preset/<label>`; a label
/// already carrying the prefix is not double-prefixed, and a model id that
/// already selects a preset is left untouched.
pub fn compose_model_id(model_id: &str, preset: Option<&str>) -> String {
    match preset {
        Some(label) if !label.is_empty() && !model_id.contains("@preset/") => {
            if let Some(stripped) = label.strip_prefix("@preset/") {
                format!("{model_id}@preset/{stripped}")
            } else {
                format!("{model_id}@preset/{label}")
            }
        }
        _ => model_id.to_string(),
    }
}

/// Strips any `@preset/<label>` suffix, yielding the catalog id used for
/// pricing lookups.
pub fn base_model_id(effective: &str) -> &str {
    match effective.find("@preset/") {
        Some(idx) => &effective[..idx],
        None => effective,
    }
}
