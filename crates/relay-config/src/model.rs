// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the relay gateway.
//!
//! All sections are optional and default to sensible values; unknown keys
//! are rejected at startup.

use serde::{Deserialize, Serialize};

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database, uploads and backups locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// OpenRouter API settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Per-endpoint rate limit policies.
    #[serde(default)]
    pub ratelimit: RateLimitConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated allowed CORS origins.
    #[serde(default = "default_app_origins")]
    pub app_origins: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ServerConfig {
    /// The CORS origins as a trimmed, non-empty list.
    pub fn origins(&self) -> Vec<String> {
        self.app_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            app_origins: default_app_origins(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_app_origins() -> String {
    "http://localhost:5173".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage locations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Root directory for uploaded documents.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Directory for downloadable database snapshots.
    #[serde(default = "default_backups_dir")]
    pub backups_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            uploads_dir: default_uploads_dir(),
            backups_dir: default_backups_dir(),
        }
    }
}

fn default_db_path() -> String {
    "./relay.db".to_string()
}

fn default_uploads_dir() -> String {
    "./uploads".to_string()
}

fn default_backups_dir() -> String {
    "./backups".to_string()
}

/// OpenRouter API configuration. The key stays server-side; it is never
/// echoed in responses or logs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    /// API key. `None` means streaming requests fail with MISSING_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL of the OpenRouter API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value for the HTTP-Referer header OpenRouter expects.
    #[serde(default = "default_http_referer")]
    pub http_referer: String,

    /// Value for the X-Title header OpenRouter expects.
    #[serde(default = "default_x_title")]
    pub x_title: String,

    /// Per-read inactivity budget on streaming connections, in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            http_referer: default_http_referer(),
            x_title: default_x_title(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_http_referer() -> String {
    "http://localhost:5173".to_string()
}

fn default_x_title() -> String {
    "Relay LLM Console".to_string()
}

fn default_read_timeout_secs() -> u64 {
    300
}

/// Rate limit policies, one per endpoint group, as `"<N> per <unit>"`
/// strings with unit in second, minute, hour or day.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    #[serde(default = "default_ratelimit_enabled")]
    pub enabled: bool,

    #[serde(default = "default_stream_limit")]
    pub stream: String,

    #[serde(default = "default_model_sync_limit")]
    pub model_sync: String,

    #[serde(default = "default_upload_limit")]
    pub upload: String,

    #[serde(default = "default_sessions_limit")]
    pub sessions: String,

    #[serde(default = "default_messages_limit")]
    pub messages: String,

    #[serde(default = "default_profiles_limit")]
    pub profiles: String,

    #[serde(default = "default_models_list_limit")]
    pub models_list: String,

    #[serde(default = "default_usage_logs_limit")]
    pub usage_logs: String,

    #[serde(default = "default_health_check_limit")]
    pub health_check: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_ratelimit_enabled(),
            stream: default_stream_limit(),
            model_sync: default_model_sync_limit(),
            upload: default_upload_limit(),
            sessions: default_sessions_limit(),
            messages: default_messages_limit(),
            profiles: default_profiles_limit(),
            models_list: default_models_list_limit(),
            usage_logs: default_usage_logs_limit(),
            health_check: default_health_check_limit(),
        }
    }
}

fn default_ratelimit_enabled() -> bool {
    true
}

fn default_stream_limit() -> String {
    "20 per minute".to_string()
}

fn default_model_sync_limit() -> String {
    "5 per hour".to_string()
}

fn default_upload_limit() -> String {
    "30 per minute".to_string()
}

fn default_sessions_limit() -> String {
    "60 per minute".to_string()
}

fn default_messages_limit() -> String {
    "100 per minute".to_string()
}

fn default_profiles_limit() -> String {
    "60 per minute".to_string()
}

fn default_models_list_limit() -> String {
    "120 per minute".to_string()
}

fn default_usage_logs_limit() -> String {
    "120 per minute".to_string()
}

fn default_health_check_limit() -> String {
    "300 per minute".to_string()
}
