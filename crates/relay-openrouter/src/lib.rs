// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenRouter API.
//!
//! [`OpenRouterClient`] constructs chat-completion requests, opens the
//! streaming connection, and decodes provider chunks into typed
//! [`ChatEvent`]s. The API key never leaves this process.

pub mod client;
pub mod sse;
pub mod types;

pub use client::OpenRouterClient;
pub use sse::ChatEvent;
pub use types::{ChatMessage, ChatRequest};
