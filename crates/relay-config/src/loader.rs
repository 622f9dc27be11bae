// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier): compiled defaults, `./relay.toml`,
//! then the recognized environment variables (`OPENROUTER_API_KEY`,
//! `APP_ORIGINS`, `DB_PATH`, `UPLOADS_DIR`, `RATE_LIMIT_*`, ...).

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RelayConfig;

/// Environment variables the gateway recognizes, paired with the config key
/// they set. Anything else in the environment is ignored.
const ENV_KEYS: &[(&str, &str)] = &[
    ("OPENROUTER_API_KEY", "openrouter.api_key"),
    ("OPENROUTER_BASE_URL", "openrouter.base_url"),
    ("OPENROUTER_HTTP_REFERER", "openrouter.http_referer"),
    ("OPENROUTER_X_TITLE", "openrouter.x_title"),
    ("APP_ORIGINS", "server.app_origins"),
    ("DB_PATH", "storage.db_path"),
    ("UPLOADS_DIR", "storage.uploads_dir"),
    ("BACKUPS_DIR", "storage.backups_dir"),
    ("RATE_LIMIT_ENABLED", "ratelimit.enabled"),
    ("RATE_LIMIT_STREAM", "ratelimit.stream"),
    ("RATE_LIMIT_MODEL_SYNC", "ratelimit.model_sync"),
    ("RATE_LIMIT_UPLOAD", "ratelimit.upload"),
    ("RATE_LIMIT_SESSIONS", "ratelimit.sessions"),
    ("RATE_LIMIT_MESSAGES", "ratelimit.messages"),
    ("RATE_LIMIT_PROFILES", "ratelimit.profiles"),
    ("RATE_LIMIT_MODELS_LIST", "ratelimit.models_list"),
    ("RATE_LIMIT_USAGE_LOGS", "ratelimit.usage_logs"),
    ("RATE_LIMIT_HEALTH_CHECK", "ratelimit.health_check"),
];

/// Load configuration from defaults, `./relay.toml` and the environment.
pub fn load_config() -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::file("relay.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string over the compiled defaults.
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Environment provider restricted to the recognized variable names.
///
/// Uses an explicit name table rather than a prefix split so that
/// `RATE_LIMIT_MODEL_SYNC` maps to `ratelimit.model_sync` and not to a
/// nested `rate.limit.model.sync` path.
fn env_provider() -> Env {
    let names: Vec<&str> = ENV_KEYS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let key_str = key.as_str().to_ascii_uppercase();
        ENV_KEYS
            .iter()
            .find(|(name, _)| *name == key_str)
            .map(|(_, path)| (*path).into())
            .unwrap_or_else(|| key_str.to_ascii_lowercase().into())
    })
}
