//! The document store: one current document per topic, serialized writes.
//!
//! Every mutation (replace, patch, revert) follows the same shape:
//!
//! 1. take the topic's write lock,
//! 2. read the current state,
//! 3. check the caller's `expected_version` precondition, if any,
//! 4. snapshot the current state into the revision log,
//! 5. install the new state with `version + 1`,
//!
//! with steps 4–5 in one database transaction. The lock covers the whole
//! read-snapshot-write cycle, so two concurrent mutations of the same
//! topic cannot interleave and lose one editor's change. Exactly one
//! revision and one version increment happen per successful mutation;
//! nothing is written when a mutation fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Block, BlockInput, Document, Editor, EditorKind, Revision};
use crate::patch::{apply_patch, BlockEdit, BlockInsert};
use crate::revisions::{self, Snapshot};

const REPLACE_SUMMARY: &str = "Replaced entire document";
const PATCH_SUMMARY: &str = "Edited document";

pub struct DocumentStore {
    pool: SqlitePool,
    default_format: String,
    /// One async mutex per topic slug, created on first write.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool, default_format: impl Into<String>) -> Self {
        Self {
            pool,
            default_format: default_format.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn topic_lock(&self, topic: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Returns the current document for a topic. No side effects.
    pub async fn get(&self, topic: &str) -> Result<Document, StoreError> {
        self.fetch(topic)
            .await?
            .ok_or_else(|| StoreError::DocumentNotFound(topic.to_string()))
    }

    /// Creates the topic's document (version 1, no revision logged) or
    /// replaces it wholesale (pre-replace state goes to the log first).
    /// Blocks without IDs get fresh ones.
    pub async fn create_or_replace(
        &self,
        topic: &str,
        blocks: Vec<BlockInput>,
        format: Option<String>,
        editor: &Editor,
        expected_version: Option<i64>,
    ) -> Result<Document, StoreError> {
        let lock = self.topic_lock(topic);
        let _guard = lock.lock().await;

        let blocks: Vec<Block> = blocks.into_iter().map(BlockInput::into_block).collect();
        let blocks_json = serde_json::to_string(&blocks)?;
        let now = Utc::now().timestamp();

        match self.fetch(topic).await? {
            None => {
                if let Some(expected) = expected_version {
                    return Err(StoreError::VersionConflict {
                        expected,
                        current: 0,
                    });
                }

                let id = Uuid::new_v4().to_string();
                let format = format.unwrap_or_else(|| self.default_format.clone());

                sqlx::query(
                    r#"
                    INSERT INTO documents
                        (id, topic_slug, blocks, version, format,
                         created_by, created_by_kind,
                         last_edited_by, last_edited_by_kind,
                         created_at, updated_at)
                    VALUES (?, ?, ?, 1, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(topic)
                .bind(&blocks_json)
                .bind(&format)
                .bind(&editor.name)
                .bind(editor.kind.as_str())
                .bind(&editor.name)
                .bind(editor.kind.as_str())
                .bind(now)
                .bind(now)
                .execute(&self.pool)
                .await?;

                Ok(Document {
                    id,
                    topic: topic.to_string(),
                    blocks,
                    version: 1,
                    format,
                    created_by: editor.name.clone(),
                    created_by_kind: editor.kind,
                    last_edited_by: editor.name.clone(),
                    last_edited_by_kind: editor.kind,
                    created_at: now,
                    updated_at: now,
                })
            }
            Some(current) => {
                check_precondition(expected_version, current.version)?;

                let format = format.unwrap_or_else(|| current.format.clone());
                self.displace(
                    &current,
                    blocks,
                    &blocks_json,
                    &format,
                    Some(REPLACE_SUMMARY),
                    editor,
                    now,
                )
                .await
            }
        }
    }

    /// Applies a batch of partial edits and inserts. Fails without side
    /// effects if the topic has no document yet or any operation in the
    /// batch references an unknown block.
    pub async fn patch(
        &self,
        topic: &str,
        edits: &[BlockEdit],
        inserts: &[BlockInsert],
        summary: Option<String>,
        editor: &Editor,
        expected_version: Option<i64>,
    ) -> Result<Document, StoreError> {
        let lock = self.topic_lock(topic);
        let _guard = lock.lock().await;

        let current = self
            .fetch(topic)
            .await?
            .ok_or_else(|| StoreError::DocumentNotFound(topic.to_string()))?;
        check_precondition(expected_version, current.version)?;

        let new_blocks = apply_patch(&current.blocks, edits, inserts)?;
        let blocks_json = serde_json::to_string(&new_blocks)?;
        let summary = summary.unwrap_or_else(|| PATCH_SUMMARY.to_string());
        let now = Utc::now().timestamp();

        self.displace(
            &current,
            new_blocks,
            &blocks_json,
            &current.format,
            Some(summary.as_str()),
            editor,
            now,
        )
        .await
    }

    /// Restores the block list of a previously displaced version. The
    /// current state is snapshotted first, so the revert itself shows up
    /// in history and can be undone the same way.
    pub async fn revert(
        &self,
        topic: &str,
        target_version: i64,
        editor: &Editor,
    ) -> Result<Document, StoreError> {
        let lock = self.topic_lock(topic);
        let _guard = lock.lock().await;

        let current = self
            .fetch(topic)
            .await?
            .ok_or_else(|| StoreError::DocumentNotFound(topic.to_string()))?;

        let target = revisions::find_by_version(&self.pool, &current.id, target_version)
            .await?
            .ok_or_else(|| StoreError::RevisionNotFound {
                topic: topic.to_string(),
                version: target_version,
            })?;

        let blocks_json = serde_json::to_string(&target.blocks)?;
        let summary = format!("Before revert to version {}", target_version);
        let now = Utc::now().timestamp();

        self.displace(
            &current,
            target.blocks,
            &blocks_json,
            &current.format,
            Some(summary.as_str()),
            editor,
            now,
        )
        .await
    }

    /// Lists the topic's revision history, newest first. The document must
    /// exist; a never-displaced (version 1) document has an empty history.
    pub async fn history(&self, topic: &str, limit: i64) -> Result<Vec<Revision>, StoreError> {
        let document = self.get(topic).await?;
        revisions::list_by_document(&self.pool, &document.id, limit).await
    }

    /// Snapshots `current` into the revision log and installs the new
    /// block list under `current.version + 1`, in one transaction.
    #[allow(clippy::too_many_arguments)]
    async fn displace(
        &self,
        current: &Document,
        new_blocks: Vec<Block>,
        new_blocks_json: &str,
        format: &str,
        edit_summary: Option<&str>,
        editor: &Editor,
        now: i64,
    ) -> Result<Document, StoreError> {
        let current_blocks_json = serde_json::to_string(&current.blocks)?;
        let new_version = current.version + 1;

        let mut tx = self.pool.begin().await?;

        revisions::append(
            &mut tx,
            Snapshot {
                document_id: &current.id,
                topic: &current.topic,
                blocks_json: &current_blocks_json,
                version: current.version,
                edit_summary,
                editor,
                created_at: now,
            },
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE documents
            SET blocks = ?, version = ?, format = ?,
                last_edited_by = ?, last_edited_by_kind = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(new_blocks_json)
        .bind(new_version)
        .bind(format)
        .bind(&editor.name)
        .bind(editor.kind.as_str())
        .bind(now)
        .bind(&current.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Document {
            id: current.id.clone(),
            topic: current.topic.clone(),
            blocks: new_blocks,
            version: new_version,
            format: format.to_string(),
            created_by: current.created_by.clone(),
            created_by_kind: current.created_by_kind,
            last_edited_by: editor.name.clone(),
            last_edited_by_kind: editor.kind,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    async fn fetch(&self, topic: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, topic_slug, blocks, version, format,
                   created_by, created_by_kind,
                   last_edited_by, last_edited_by_kind,
                   created_at, updated_at
            FROM documents
            WHERE topic_slug = ?
            "#,
        )
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(document_from_row).transpose()
    }
}

fn check_precondition(expected: Option<i64>, current: i64) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != current => {
            Err(StoreError::VersionConflict { expected, current })
        }
        _ => Ok(()),
    }
}

fn document_from_row(row: &SqliteRow) -> Result<Document, StoreError> {
    let blocks_json: String = row.get("blocks");

    let created_kind: String = row.get("created_by_kind");
    let edited_kind: String = row.get("last_edited_by_kind");
    let created_by_kind = EditorKind::parse(&created_kind)
        .ok_or_else(|| StoreError::CorruptEditorKind(created_kind.clone()))?;
    let last_edited_by_kind = EditorKind::parse(&edited_kind)
        .ok_or_else(|| StoreError::CorruptEditorKind(edited_kind.clone()))?;

    Ok(Document {
        id: row.get("id"),
        topic: row.get("topic_slug"),
        blocks: serde_json::from_str(&blocks_json)?,
        version: row.get("version"),
        format: row.get("format"),
        created_by: row.get("created_by"),
        created_by_kind,
        last_edited_by: row.get("last_edited_by"),
        last_edited_by_kind,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
