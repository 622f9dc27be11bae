// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the relay gateway.
//!
//! This crate provides the domain types, the internal error type, and the
//! wire-level error taxonomy shared by every other crate in the workspace.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ApiError, ErrorCode, ErrorEnvelope, RelayError};
pub use types::{Role, SessionType, TokenUsage};
