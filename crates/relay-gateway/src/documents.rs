// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uploaded-document access rooted at the uploads directory.
//!
//! Every access path canonicalizes the requested name and verifies the
//! result is a descendant of the uploads root; anything else fails as
//! `DOCUMENT_NOT_FOUND`. Rejections are indistinguishable from genuinely
//! missing files so directory structure never leaks.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use relay_core::{ApiError, ErrorCode};
use serde::Serialize;

/// Metadata for one stored document. `id` is the filename.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub created_at: String,
}

fn not_found(id: &str) -> ApiError {
    ApiError::not_found(ErrorCode::DocumentNotFound, "document", id)
}

fn timestamp_from(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

async fn meta_for(path: &Path, id: &str) -> Result<DocumentMeta, ApiError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| not_found(id))?;
    Ok(DocumentMeta {
        id: id.to_string(),
        name: id.to_string(),
        size: metadata.len(),
        created_at: timestamp_from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
    })
}

/// Resolves `id` to a regular file strictly inside the uploads root.
async fn resolve(root: &Path, id: &str) -> Result<PathBuf, ApiError> {
    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|_| not_found(id))?;
    let candidate = canonical_root.join(id);
    let canonical = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| not_found(id))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(not_found(id));
    }
    let metadata = tokio::fs::metadata(&canonical)
        .await
        .map_err(|_| not_found(id))?;
    if !metadata.is_file() {
        return Err(not_found(id));
    }
    Ok(canonical)
}

/// Lists stored documents, newest first.
pub async fn list_documents(root: &Path) -> Result<Vec<DocumentMeta>, ApiError> {
    let mut docs = Vec::new();
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        // No uploads yet.
        Err(_) => return Ok(docs),
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        docs.push(DocumentMeta {
            created_at: timestamp_from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
            size: metadata.len(),
            id: name.clone(),
            name,
        });
    }
    docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(docs)
}

/// Loads one document's metadata and text content.
pub async fn load_document(root: &Path, id: &str) -> Result<(DocumentMeta, String), ApiError> {
    let path = resolve(root, id).await?;
    let bytes = tokio::fs::read(&path).await.map_err(|_| not_found(id))?;
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let meta = meta_for(&path, id).await?;
    Ok((meta, content))
}

/// Stores an upload under its sanitized filename, suffixing `_1`, `_2`, …
/// on collision.
pub async fn save_document(
    root: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<DocumentMeta, ApiError> {
    let safe_name = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty() && n != "." && n != "..")
        .ok_or_else(|| ApiError::new(ErrorCode::MissingFilename, "No filename provided"))?;

    tokio::fs::create_dir_all(root).await.map_err(|e| {
        ApiError::new(ErrorCode::FileSaveFailed, format!("Failed to save file: {e}"))
    })?;

    let stem = Path::new(&safe_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| safe_name.clone());
    let extension = Path::new(&safe_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut target_name = safe_name.clone();
    let mut target = root.join(&target_name);
    let mut counter = 1;
    while tokio::fs::try_exists(&target).await.unwrap_or(false) {
        target_name = format!("{stem}_{counter}{extension}");
        target = root.join(&target_name);
        counter += 1;
    }

    tokio::fs::write(&target, bytes).await.map_err(|e| {
        ApiError::new(ErrorCode::FileSaveFailed, format!("Failed to save file: {e}"))
    })?;
    meta_for(&target, &target_name).await
}

/// Deletes one document.
pub async fn delete_document(root: &Path, id: &str) -> Result<(), ApiError> {
    let path = resolve(root, id).await?;
    tokio::fs::remove_file(&path).await.map_err(|e| {
        ApiError::new(
            ErrorCode::FileDeleteFailed,
            format!("Failed to delete file: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let meta = save_document(dir.path(), "notes.txt", b"hello world")
            .await
            .unwrap();
        assert_eq!(meta.id, "notes.txt");
        assert_eq!(meta.size, 11);

        let (loaded, content) = load_document(dir.path(), "notes.txt").await.unwrap();
        assert_eq!(loaded.id, "notes.txt");
        assert_eq!(content, "hello world");
    }

    #[tokio::test]
    async fn upload_filename_is_sanitized_to_final_component() {
        let dir = tempdir().unwrap();
        let meta = save_document(dir.path(), "../../etc/passwd.txt", b"x")
            .await
            .unwrap();
        assert_eq!(meta.id, "passwd.txt");
        assert!(dir.path().join("passwd.txt").exists());
    }

    #[tokio::test]
    async fn collisions_get_numeric_suffixes() {
        let dir = tempdir().unwrap();
        save_document(dir.path(), "report.md", b"one").await.unwrap();
        let second = save_document(dir.path(), "report.md", b"two").await.unwrap();
        let third = save_document(dir.path(), "report.md", b"three").await.unwrap();
        assert_eq!(second.id, "report_1.md");
        assert_eq!(third.id, "report_2.md");
    }

    #[tokio::test]
    async fn empty_filename_is_rejected() {
        let dir = tempdir().unwrap();
        let err = save_document(dir.path(), "", b"x").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingFilename);
    }

    #[tokio::test]
    async fn traversal_reads_fail_as_not_found() {
        let dir = tempdir().unwrap();
        let outside = dir.path().join("outside.txt");
        tokio::fs::write(&outside, b"secret").await.unwrap();
        let uploads = dir.path().join("uploads");
        tokio::fs::create_dir_all(&uploads).await.unwrap();

        let err = load_document(&uploads, "../outside.txt").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentNotFound);

        let err = delete_document(&uploads, "../outside.txt").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentNotFound);
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn missing_document_fails_as_not_found() {
        let dir = tempdir().unwrap();
        let err = load_document(dir.path(), "nope.txt").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentNotFound);
    }

    #[tokio::test]
    async fn list_returns_files_newest_first() {
        let dir = tempdir().unwrap();
        save_document(dir.path(), "a.txt", b"1").await.unwrap();
        save_document(dir.path(), "b.txt", b"2").await.unwrap();
        let docs = list_documents(dir.path()).await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let dir = tempdir().unwrap();
        save_document(dir.path(), "gone.txt", b"x").await.unwrap();
        delete_document(dir.path(), "gone.txt").await.unwrap();
        let err = load_document(dir.path(), "gone.txt").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentNotFound);
    }
}
