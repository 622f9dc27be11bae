// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model catalog operations.

use relay_core::types::{ModelFilter, ModelRow, ModelSync};
use relay_core::RelayError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

fn row_to_model(row: &rusqlite::Row) -> Result<ModelRow, rusqlite::Error> {
    Ok(ModelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        context_length: row.get(2)?,
        pricing_prompt: row.get(3)?,
        pricing_completion: row.get(4)?,
        is_reasoning: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

const MODEL_COLUMNS: &str =
    "id, name, context_length, pricing_prompt, pricing_completion, is_reasoning, created_at";

/// Bulk-upserts catalog rows by external id. Returns the number ingested.
pub async fn upsert_models(db: &Database, rows: Vec<ModelSync>) -> Result<usize, RelayError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let count = rows.len();
            for model in rows {
                tx.execute(
                    "INSERT INTO models (id, name, context_length, pricing_prompt, pricing_completion, is_reasoning)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       context_length = excluded.context_length,
                       pricing_prompt = excluded.pricing_prompt,
                       pricing_completion = excluded.pricing_completion,
                       is_reasoning = excluded.is_reasoning",
                    params![
                        model.id,
                        model.name,
                        model.context_length,
                        model.pricing_prompt,
                        model.pricing_completion,
                        model.is_reasoning as i64,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Lists catalog rows matching the filter, ordered by name.
pub async fn list_models(db: &Database, filter: ModelFilter) -> Result<Vec<ModelRow>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {MODEL_COLUMNS} FROM models WHERE 1=1");
            let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            if let Some(reasoning) = filter.reasoning {
                sql.push_str(" AND is_reasoning = ?");
                args.push(Box::new(reasoning as i64));
            }
            if let Some(min_context) = filter.min_context {
                sql.push_str(" AND (context_length IS NULL OR context_length >= ?)");
                args.push(Box::new(min_context));
            }
            if let Some(max_price) = filter.max_price {
                sql.push_str(
                    " AND (pricing_prompt IS NULL OR pricing_prompt <= ?)
                      AND (pricing_completion IS NULL OR pricing_completion <= ?)",
                );
                args.push(Box::new(max_price));
                args.push(Box::new(max_price));
            }
            sql.push_str(" ORDER BY name COLLATE NOCASE ASC");

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                args.iter().map(|a| a.as_ref()).collect();
            let models = stmt
                .query_map(params.as_slice(), row_to_model)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(models)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetches one catalog row by external id.
pub async fn get_model(db: &Database, id: &str) -> Result<Option<ModelRow>, RelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let model = conn
                .query_row(
                    &format!("SELECT {MODEL_COLUMNS} FROM models WHERE id = ?1"),
                    params![id],
                    row_to_model,
                )
                .optional()?;
            Ok(model)
        })
        .await
        .map_err(map_tr_err)
}
