// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage accounting: per-completion rows and the aggregate views.

use relay_core::types::{base_model_id, ModelUsage, UsageDraft, UsageGroup, UsageLog, UsagePeriod, UsageStats};
use relay_core::RelayError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::queries::{new_id, now_timestamp};

fn row_to_usage(row: &rusqlite::Row) -> Result<UsageLog, rusqlite::Error> {
    Ok(UsageLog {
        id: row.get(0)?,
        session_id: row.get(1)?,
        profile_id: row.get(2)?,
        model_id: row.get(3)?,
        prompt_tokens: row.get(4)?,
        completion_tokens: row.get(5)?,
        total_tokens: row.get(6)?,
        cost_usd: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const USAGE_COLUMNS: &str = "id, session_id, profile_id, model_id, prompt_tokens, \
                             completion_tokens, total_tokens, cost_usd, created_at";

/// Appends one usage row. Cost is `prompt_tokens × pricing_prompt +
/// completion_tokens × pricing_completion` with unit prices in dollars per
/// token, looked up by the base model id (any `@preset/…` suffix stripped);
/// an unknown model or missing price contributes zero.
pub async fn insert_usage(db: &Database, draft: UsageDraft) -> Result<UsageLog, RelayError> {
    let id = new_id();
    let created_at = now_timestamp();
    db.connection()
        .call(move |conn| {
            let prompt_tokens = draft.prompt_tokens.max(0);
            let completion_tokens = draft.completion_tokens.max(0);
            let total_tokens = prompt_tokens + completion_tokens;

            let (pricing_prompt, pricing_completion) = match &draft.model_id {
                Some(model_id) => conn
                    .query_row(
                        "SELECT pricing_prompt, pricing_completion FROM models WHERE id = ?1",
                        params![base_model_id(model_id)],
                        |row| {
                            Ok((
                                row.get::<_, Option<f64>>(0)?,
                                row.get::<_, Option<f64>>(1)?,
                            ))
                        },
                    )
                    .optional()?
                    .unwrap_or((None, None)),
                None => (None, None),
            };
            let cost_usd = prompt_tokens as f64 * pricing_prompt.unwrap_or(0.0)
                + completion_tokens as f64 * pricing_completion.unwrap_or(0.0);

            conn.execute(
                "INSERT INTO usage_logs (id, session_id, profile_id, model_id,
                   prompt_tokens, completion_tokens, total_tokens, cost_usd, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    draft.session_id,
                    draft.profile_id,
                    draft.model_id,
                    prompt_tokens,
                    completion_tokens,
                    total_tokens,
                    cost_usd,
                    created_at,
                ],
            )?;
            let log = conn.query_row(
                &format!("SELECT {USAGE_COLUMNS} FROM usage_logs WHERE id = ?1"),
                params![id],
                row_to_usage,
            )?;
            Ok(log)
        })
        .await
        .map_err(map_tr_err)
}

/// Lists a session's usage rows, newest first.
pub async fn list_usage_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Vec<UsageLog>, RelayError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USAGE_COLUMNS} FROM usage_logs
                 WHERE session_id = ?1 ORDER BY created_at DESC"
            ))?;
            let logs = stmt
                .query_map(params![session_id], row_to_usage)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(logs)
        })
        .await
        .map_err(map_tr_err)
}

/// Per-model breakdown, most expensive first.
pub async fn usage_by_model(db: &Database) -> Result<Vec<ModelUsage>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT ul.model_id, m.name,
                        SUM(ul.prompt_tokens), SUM(ul.completion_tokens),
                        SUM(ul.total_tokens), SUM(ul.cost_usd)
                 FROM usage_logs ul
                 LEFT JOIN models m ON m.id = ul.model_id
                 GROUP BY ul.model_id
                 ORDER BY SUM(ul.cost_usd) DESC, SUM(ul.total_tokens) DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ModelUsage {
                        model_id: row.get(0)?,
                        model_name: row.get(1)?,
                        prompt_tokens: row.get(2)?,
                        completion_tokens: row.get(3)?,
                        total_tokens: row.get(4)?,
                        cost_usd: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Timeline over a date range, grouped by day, week or month.
pub async fn usage_timeline(
    db: &Database,
    group: UsageGroup,
    start_date: Option<String>,
    end_date: Option<String>,
) -> Result<Vec<UsagePeriod>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut sql = format!(
                "SELECT strftime('{}', created_at) AS period,
                        SUM(total_tokens), SUM(prompt_tokens), SUM(completion_tokens),
                        SUM(cost_usd), COUNT(*)
                 FROM usage_logs WHERE 1=1",
                group.strftime_pattern()
            );
            let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            if let Some(start) = start_date {
                sql.push_str(" AND created_at >= ?");
                args.push(Box::new(start));
            }
            if let Some(end) = end_date {
                sql.push_str(" AND created_at <= ?");
                args.push(Box::new(end));
            }
            sql.push_str(" GROUP BY period ORDER BY period ASC");

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                args.iter().map(|a| a.as_ref()).collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(UsagePeriod {
                        period: row.get(0)?,
                        total_tokens: row.get(1)?,
                        prompt_tokens: row.get(2)?,
                        completion_tokens: row.get(3)?,
                        cost_usd: row.get(4)?,
                        requests: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Overall statistics across every usage row.
pub async fn usage_stats(db: &Database) -> Result<UsageStats, RelayError> {
    db.connection()
        .call(move |conn| {
            let stats = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(prompt_tokens), 0),
                        COALESCE(SUM(completion_tokens), 0),
                        COALESCE(SUM(total_tokens), 0),
                        COALESCE(SUM(cost_usd), 0),
                        COUNT(DISTINCT model_id),
                        COUNT(DISTINCT session_id),
                        MIN(created_at),
                        MAX(created_at)
                 FROM usage_logs",
                [],
                |row| {
                    let total_requests: i64 = row.get(0)?;
                    let total_cost_usd: f64 = row.get(4)?;
                    Ok(UsageStats {
                        total_requests,
                        prompt_tokens: row.get(1)?,
                        completion_tokens: row.get(2)?,
                        total_tokens: row.get(3)?,
                        total_cost_usd,
                        unique_models: row.get(5)?,
                        unique_sessions: row.get(6)?,
                        avg_cost_per_request: if total_requests > 0 {
                            total_cost_usd / total_requests as f64
                        } else {
                            0.0
                        },
                        first_request_at: row.get(7)?,
                        last_request_at: row.get(8)?,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}
