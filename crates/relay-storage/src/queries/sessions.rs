// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD operations.

use std::str::FromStr;

use relay_core::types::{Session, SessionDraft, SessionType, SessionUpdate};
use relay_core::RelayError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::queries::{new_id, now_timestamp};

fn row_to_session(row: &rusqlite::Row) -> Result<Session, rusqlite::Error> {
    let session_type: String = row.get(1)?;
    Ok(Session {
        id: row.get(0)?,
        session_type: SessionType::from_str(&session_type).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        title: row.get(2)?,
        profile_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const SESSION_COLUMNS: &str = "id, session_type, title, profile_id, created_at";

/// Creates a session with a fresh opaque id and returns the stored row.
pub async fn create_session(db: &Database, draft: SessionDraft) -> Result<Session, RelayError> {
    let id = new_id();
    let created_at = now_timestamp();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, session_type, title, profile_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    draft.session_type.to_string(),
                    draft.title,
                    draft.profile_id,
                    created_at,
                ],
            )?;
            let session = conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetches a session by id.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, RelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let session = conn
                .query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                    params![id],
                    row_to_session,
                )
                .optional()?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Lists sessions, newest first.
pub async fn list_sessions(db: &Database, limit: i64) -> Result<Vec<Session>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY created_at DESC LIMIT ?1"
            ))?;
            let sessions = stmt
                .query_map(params![limit], row_to_session)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
        .await
        .map_err(map_tr_err)
}

/// Applies a partial update; absent fields are untouched. Returns false
/// when the id does not exist.
pub async fn update_session(
    db: &Database,
    id: &str,
    update: SessionUpdate,
) -> Result<bool, RelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut fields = Vec::new();
            let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            if let Some(title) = update.title {
                fields.push("title = ?");
                args.push(Box::new(title));
            }
            if let Some(profile_id) = update.profile_id {
                fields.push("profile_id = ?");
                args.push(Box::new(profile_id));
            }
            if fields.is_empty() {
                let exists: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM sessions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                return Ok(exists > 0);
            }
            args.push(Box::new(id));
            let sql = format!("UPDATE sessions SET {} WHERE id = ?", fields.join(", "));
            let params: Vec<&dyn rusqlite::types::ToSql> =
                args.iter().map(|a| a.as_ref()).collect();
            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a session; messages and usage rows cascade. Returns false when
/// the id does not exist.
pub async fn delete_session(db: &Database, id: &str) -> Result<bool, RelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
