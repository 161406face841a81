//! The append-only revision log.
//!
//! One row per displaced document state. The [`DocumentStore`] is the sole
//! writer — [`append`] takes an open transaction so the snapshot and the
//! document update it belongs to commit or roll back together. Rows are
//! never updated or deleted.
//!
//! [`DocumentStore`]: crate::store::DocumentStore

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::error::StoreError;
use crate::models::{Editor, EditorKind, Revision};

/// A document state about to be displaced, serialized for the log.
#[derive(Debug)]
pub struct Snapshot<'a> {
    pub document_id: &'a str,
    pub topic: &'a str,
    pub blocks_json: &'a str,
    pub version: i64,
    pub edit_summary: Option<&'a str>,
    pub editor: &'a Editor,
    pub created_at: i64,
}

/// Appends one revision inside the caller's transaction.
pub async fn append(conn: &mut SqliteConnection, snapshot: Snapshot<'_>) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO document_revisions
            (document_id, topic_slug, blocks, version, edit_summary,
             edited_by, edited_by_kind, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(snapshot.document_id)
    .bind(snapshot.topic)
    .bind(snapshot.blocks_json)
    .bind(snapshot.version)
    .bind(snapshot.edit_summary)
    .bind(&snapshot.editor.name)
    .bind(snapshot.editor.kind.as_str())
    .bind(snapshot.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Lists a document's revisions, newest first. The rowid breaks ties
/// between snapshots created in the same second.
pub async fn list_by_document(
    pool: &SqlitePool,
    document_id: &str,
    limit: i64,
) -> Result<Vec<Revision>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, document_id, topic_slug, blocks, version, edit_summary,
               edited_by, edited_by_kind, created_at
        FROM document_revisions
        WHERE document_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(document_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(revision_from_row).collect()
}

/// Finds the revision whose snapshot *was* `version`. The live version is
/// never in the log (it has not been displaced), so looking it up returns
/// `None`.
pub async fn find_by_version(
    pool: &SqlitePool,
    document_id: &str,
    version: i64,
) -> Result<Option<Revision>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT id, document_id, topic_slug, blocks, version, edit_summary,
               edited_by, edited_by_kind, created_at
        FROM document_revisions
        WHERE document_id = ? AND version = ?
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .bind(document_id)
    .bind(version)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(revision_from_row).transpose()
}

fn revision_from_row(row: &SqliteRow) -> Result<Revision, StoreError> {
    let blocks_json: String = row.get("blocks");
    let kind_str: String = row.get("edited_by_kind");
    let kind = EditorKind::parse(&kind_str)
        .ok_or_else(|| StoreError::CorruptEditorKind(kind_str.clone()))?;

    Ok(Revision {
        id: row.get("id"),
        document_id: row.get("document_id"),
        topic: row.get("topic_slug"),
        blocks: serde_json::from_str(&blocks_json)?,
        version: row.get("version"),
        edit_summary: row.get("edit_summary"),
        edited_by: row.get("edited_by"),
        edited_by_kind: kind,
        created_at: row.get("created_at"),
    })
}
