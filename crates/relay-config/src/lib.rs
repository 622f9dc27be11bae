// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the relay gateway.
//!
//! Loaded with Figment: compiled defaults, then an optional `relay.toml`,
//! then the recognized environment variables.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_str};
pub use model::{
    OpenRouterConfig, RateLimitConfig, RelayConfig, ServerConfig, StorageConfig,
};
