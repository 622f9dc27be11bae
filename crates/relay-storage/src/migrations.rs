// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Numbered schema migrations with forward and backward scripts.
//!
//! Applied versions are recorded in `schema_migrations`; the runner skips
//! anything already applied, so replaying the full set is a no-op. Each
//! script runs inside its own transaction with foreign keys off (SQLite
//! cannot rebuild referenced tables otherwise); enforcement is restored
//! afterwards.

use rusqlite::{params, Connection};

/// One schema migration: a forward script and the backward script that
/// undoes it.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

const CREATE_SCHEMA_MIGRATIONS: &str = "
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  name TEXT NOT NULL,
  applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);";

const V1_UP: &str = "
CREATE TABLE IF NOT EXISTS models (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  context_length INTEGER,
  pricing_prompt REAL,
  pricing_completion REAL,
  is_reasoning INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS profiles (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  system_prompt TEXT,
  temperature REAL NOT NULL DEFAULT 0.7,
  max_tokens INTEGER NOT NULL DEFAULT 2048,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS sessions (
  id TEXT PRIMARY KEY,
  session_type TEXT NOT NULL CHECK(session_type IN ('chat','code','documents','playground')),
  title TEXT,
  profile_id INTEGER,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
  FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS messages (
  id TEXT PRIMARY KEY,
  session_id TEXT NOT NULL,
  role TEXT NOT NULL CHECK(role IN ('system','user','assistant','tool')),
  content TEXT NOT NULL,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
  FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_session_created ON messages(session_id, created_at);

CREATE TABLE IF NOT EXISTS usage_logs (
  id TEXT PRIMARY KEY,
  session_id TEXT NOT NULL,
  profile_id INTEGER,
  model_id TEXT,
  prompt_tokens INTEGER NOT NULL DEFAULT 0,
  completion_tokens INTEGER NOT NULL DEFAULT 0,
  total_tokens INTEGER NOT NULL DEFAULT 0,
  cost_usd REAL NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
  FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE,
  FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_logs_session_created ON usage_logs(session_id, created_at);
CREATE INDEX IF NOT EXISTS idx_usage_logs_model_created ON usage_logs(model_id, created_at);
";

const V1_DOWN: &str = "
DROP TABLE IF EXISTS usage_logs;
DROP TABLE IF EXISTS messages;
DROP TABLE IF EXISTS sessions;
DROP TABLE IF EXISTS profiles;
DROP TABLE IF EXISTS models;
";

const V2_UP: &str = "
ALTER TABLE profiles ADD COLUMN preset TEXT;
";

// SQLite cannot drop a column from a referenced table in place; rebuild the
// table preserving the remaining columns and data.
const V2_DOWN: &str = "
CREATE TABLE profiles_rollback (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  system_prompt TEXT,
  temperature REAL NOT NULL DEFAULT 0.7,
  max_tokens INTEGER NOT NULL DEFAULT 2048,
  created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
INSERT INTO profiles_rollback (id, name, system_prompt, temperature, max_tokens, created_at)
  SELECT id, name, system_prompt, temperature, max_tokens, created_at FROM profiles;
DROP TABLE profiles;
ALTER TABLE profiles_rollback RENAME TO profiles;
";

const V3_UP: &str = "
CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
  content,
  role UNINDEXED,
  session_id UNINDEXED,
  created_at UNINDEXED,
  content='messages',
  content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS messages_fts_ai AFTER INSERT ON messages BEGIN
  INSERT INTO messages_fts(rowid, content, role, session_id, created_at)
    VALUES (new.rowid, new.content, new.role, new.session_id, new.created_at);
END;

CREATE TRIGGER IF NOT EXISTS messages_fts_ad AFTER DELETE ON messages BEGIN
  INSERT INTO messages_fts(messages_fts, rowid, content, role, session_id, created_at)
    VALUES ('delete', old.rowid, old.content, old.role, old.session_id, old.created_at);
END;

CREATE TRIGGER IF NOT EXISTS messages_fts_au AFTER UPDATE ON messages BEGIN
  INSERT INTO messages_fts(messages_fts, rowid, content, role, session_id, created_at)
    VALUES ('delete', old.rowid, old.content, old.role, old.session_id, old.created_at);
  INSERT INTO messages_fts(rowid, content, role, session_id, created_at)
    VALUES (new.rowid, new.content, new.role, new.session_id, new.created_at);
END;

INSERT INTO messages_fts(rowid, content, role, session_id, created_at)
  SELECT rowid, content, role, session_id, created_at FROM messages;
";

const V3_DOWN: &str = "
DROP TRIGGER IF EXISTS messages_fts_ai;
DROP TRIGGER IF EXISTS messages_fts_ad;
DROP TRIGGER IF EXISTS messages_fts_au;
DROP TABLE IF EXISTS messages_fts;
";

/// All migrations, ascending by version.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        up: V1_UP,
        down: V1_DOWN,
    },
    Migration {
        version: 2,
        name: "add_profile_preset",
        up: V2_UP,
        down: V2_DOWN,
    },
    Migration {
        version: 3,
        name: "add_message_fts",
        up: V3_UP,
        down: V3_DOWN,
    },
];

/// Applies every pending migration in order; returns how many ran.
pub fn apply_all(conn: &mut Connection) -> Result<usize, rusqlite::Error> {
    conn.execute_batch(CREATE_SCHEMA_MIGRATIONS)?;
    let fk_was_on = foreign_keys_enabled(conn)?;
    conn.pragma_update(None, "foreign_keys", false)?;
    let result = apply_pending(conn);
    conn.pragma_update(None, "foreign_keys", fk_was_on)?;
    result
}

fn apply_pending(conn: &mut Connection) -> Result<usize, rusqlite::Error> {
    let mut applied = 0;
    for migration in MIGRATIONS {
        if is_applied(conn, migration.version)? {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;
        applied += 1;
    }
    Ok(applied)
}

/// Rolls back applied migrations, newest first, down to (and excluding)
/// `target_version`. `rollback_to(conn, 0)` reverts everything.
pub fn rollback_to(conn: &mut Connection, target_version: i64) -> Result<usize, rusqlite::Error> {
    conn.execute_batch(CREATE_SCHEMA_MIGRATIONS)?;
    let fk_was_on = foreign_keys_enabled(conn)?;
    conn.pragma_update(None, "foreign_keys", false)?;
    let result = rollback_pending(conn, target_version);
    conn.pragma_update(None, "foreign_keys", fk_was_on)?;
    result
}

fn rollback_pending(conn: &mut Connection, target_version: i64) -> Result<usize, rusqlite::Error> {
    let mut reverted = 0;
    for migration in MIGRATIONS.iter().rev() {
        if migration.version <= target_version || !is_applied(conn, migration.version)? {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(migration.down)?;
        tx.execute(
            "DELETE FROM schema_migrations WHERE version = ?1",
            params![migration.version],
        )?;
        tx.commit()?;
        reverted += 1;
    }
    Ok(reverted)
}

fn is_applied(conn: &Connection, version: i64) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
        params![version],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn foreign_keys_enabled(conn: &Connection) -> Result<bool, rusqlite::Error> {
    let on: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    Ok(on == 1)
}
