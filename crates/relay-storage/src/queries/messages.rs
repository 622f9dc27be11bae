// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations: append, chronological listing, and full-text search
//! over the FTS shadow table.

use std::str::FromStr;

use relay_core::types::{Message, Role, SearchHit, SearchQuery, SessionType};
use relay_core::RelayError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::{new_id, now_timestamp};

/// Hard ceiling on search page size.
pub const SEARCH_LIMIT_MAX: i64 = 200;

fn row_to_message(row: &rusqlite::Row) -> Result<Message, rusqlite::Error> {
    let role: String = row.get(2)?;
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: Role::from_str(&role).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Appends a message to a session and returns the stored row.
pub async fn append_message(
    db: &Database,
    session_id: &str,
    role: Role,
    content: &str,
) -> Result<Message, RelayError> {
    let message = Message {
        id: new_id(),
        session_id: session_id.to_string(),
        role,
        content: content.to_string(),
        created_at: now_timestamp(),
    };
    let stored = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    stored.id,
                    stored.session_id,
                    stored.role.to_string(),
                    stored.content,
                    stored.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(message)
}

/// Lists a session's messages in their total order `(created_at, id)`.
pub async fn list_messages(db: &Database, session_id: &str) -> Result<Vec<Message>, RelayError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, created_at
                 FROM messages WHERE session_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let messages = stmt
                .query_map(params![session_id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Rewrites the user-facing query into FTS5 MATCH syntax: a `-term`
/// exclusion becomes `NOT term`. Quoted phrases pass through untouched.
fn translate_match_query(raw: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in raw.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    let mut translated: Vec<String> = Vec::new();
    for token in tokens {
        match token.strip_prefix('-') {
            // NOT is infix in FTS5, so a leading exclusion stays literal.
            Some(stripped) if !stripped.is_empty() && !translated.is_empty() => {
                translated.push("NOT".to_string());
                translated.push(stripped.to_string());
            }
            _ => translated.push(token),
        }
    }
    translated.join(" ")
}

/// Ranked full-text search over message content.
///
/// Results are ordered best-first by BM25 score with `created_at DESC` as
/// the tie-break, and snippets carry `<mark>` highlight markers. A query the
/// FTS engine rejects surfaces as [`RelayError::InvalidQuery`].
pub async fn search_messages(
    db: &Database,
    query: SearchQuery,
) -> Result<Vec<SearchHit>, RelayError> {
    if query.query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let match_query = translate_match_query(&query.query);
    let limit = query.limit.clamp(1, SEARCH_LIMIT_MAX);
    let offset = query.offset.max(0);
    let result = db
        .connection()
        .call(move |conn| {
            let mut sql = String::from(
                "SELECT m.id, m.session_id, m.role, m.content, m.created_at,
                        s.session_type, s.title,
                        snippet(messages_fts, 0, '<mark>', '</mark>', '…', 12) AS snip,
                        bm25(messages_fts) AS rank
                 FROM messages_fts
                 JOIN messages m ON m.rowid = messages_fts.rowid
                 JOIN sessions s ON s.id = m.session_id
                 WHERE messages_fts MATCH ?",
            );
            let mut args: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(match_query)];
            if let Some(session_type) = query.session_type {
                sql.push_str(" AND s.session_type = ?");
                args.push(Box::new(session_type.to_string()));
            }
            if let Some(session_id) = &query.session_id {
                sql.push_str(" AND m.session_id = ?");
                args.push(Box::new(session_id.clone()));
            }
            if let Some(model_id) = &query.model_id {
                sql.push_str(
                    " AND m.session_id IN (SELECT session_id FROM usage_logs WHERE model_id = ?)",
                );
                args.push(Box::new(model_id.clone()));
            }
            if let Some(start) = &query.start_date {
                sql.push_str(" AND m.created_at >= ?");
                args.push(Box::new(start.clone()));
            }
            if let Some(end) = &query.end_date {
                sql.push_str(" AND m.created_at <= ?");
                args.push(Box::new(end.clone()));
            }
            sql.push_str(" ORDER BY rank ASC, m.created_at DESC LIMIT ? OFFSET ?");
            args.push(Box::new(limit));
            args.push(Box::new(offset));

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                args.iter().map(|a| a.as_ref()).collect();
            let hits = stmt
                .query_map(params.as_slice(), |row| {
                    let role: String = row.get(2)?;
                    let session_type: String = row.get(5)?;
                    Ok(SearchHit {
                        id: row.get(0)?,
                        session_id: row.get(1)?,
                        role: Role::from_str(&role).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                2,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                        session_type: SessionType::from_str(&session_type).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                5,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                        session_title: row.get(6)?,
                        snippet: row.get(7)?,
                        rank: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(hits)
        })
        .await;

    result.map_err(|e| match &e {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(_, Some(msg)))
            if msg.contains("fts5")
                || msg.contains("syntax error")
                || msg.contains("unterminated string")
                || msg.contains("malformed MATCH") =>
        {
            RelayError::InvalidQuery(msg.clone())
        }
        _ => map_tr_err(e),
    })
}
