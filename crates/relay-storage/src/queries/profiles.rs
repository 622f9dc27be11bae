// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profile CRUD operations.

use relay_core::types::{Profile, ProfileDraft};
use relay_core::RelayError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

fn row_to_profile(row: &rusqlite::Row) -> Result<Profile, rusqlite::Error> {
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        system_prompt: row.get(2)?,
        temperature: row.get(3)?,
        max_tokens: row.get(4)?,
        preset: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const PROFILE_COLUMNS: &str =
    "id, name, system_prompt, temperature, max_tokens, preset, created_at";

/// Inserts a profile and returns the stored row.
pub async fn create_profile(db: &Database, draft: ProfileDraft) -> Result<Profile, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO profiles (name, system_prompt, temperature, max_tokens, preset)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    draft.name,
                    draft.system_prompt,
                    draft.temperature,
                    draft.max_tokens,
                    draft.preset,
                ],
            )?;
            let id = conn.last_insert_rowid();
            let profile = conn.query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id],
                row_to_profile,
            )?;
            Ok(profile)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetches a profile by id.
pub async fn get_profile(db: &Database, id: i64) -> Result<Option<Profile>, RelayError> {
    db.connection()
        .call(move |conn| {
            let profile = conn
                .query_row(
                    &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                    params![id],
                    row_to_profile,
                )
                .optional()?;
            Ok(profile)
        })
        .await
        .map_err(map_tr_err)
}

/// Lists all profiles, newest first.
pub async fn list_profiles(db: &Database) -> Result<Vec<Profile>, RelayError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY id DESC"
            ))?;
            let profiles = stmt
                .query_map([], row_to_profile)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(profiles)
        })
        .await
        .map_err(map_tr_err)
}

/// Replaces a profile's fields. Returns false when the id does not exist.
pub async fn update_profile(
    db: &Database,
    id: i64,
    draft: ProfileDraft,
) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE profiles
                 SET name = ?1, system_prompt = ?2, temperature = ?3, max_tokens = ?4, preset = ?5
                 WHERE id = ?6",
                params![
                    draft.name,
                    draft.system_prompt,
                    draft.temperature,
                    draft.max_tokens,
                    draft.preset,
                    id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Deletes a profile. Sessions referencing it have their reference nulled
/// by the foreign key action. Returns false when the id does not exist.
pub async fn delete_profile(db: &Database, id: i64) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM profiles WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
