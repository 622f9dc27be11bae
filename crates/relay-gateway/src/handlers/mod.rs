// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers, one module per resource.

pub mod admin;
pub mod cache;
pub mod documents;
pub mod health;
pub mod messages;
pub mod models;
pub mod profiles;
pub mod sessions;
pub mod usage;
