// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the relay gateway.
//!
//! [`Database`] owns the connection (PRAGMA setup, migrations on open);
//! the `queries` modules hold the per-entity SQL; [`Repository`] is the
//! single choke point the gateway talks to, layering the TTL caches over
//! profile and model reads.

pub mod backup;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod repo;

pub use database::Database;
pub use repo::Repository;
