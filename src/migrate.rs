use anyhow::Result;
use sqlx::SqlitePool;

/// Creates the schema. Idempotent; `cdoc init` and server startup both run
/// this.
///
/// Block lists are stored as JSON text. Documents are keyed by an opaque
/// UUID with a unique index on the owning topic slug (one document per
/// topic); revisions use the rowid so insertion order is a total order even
/// when two mutations land in the same second.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            topic_slug TEXT NOT NULL UNIQUE,
            blocks TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 1,
            format TEXT NOT NULL DEFAULT 'markdown',
            created_by TEXT NOT NULL,
            created_by_kind TEXT NOT NULL,
            last_edited_by TEXT NOT NULL,
            last_edited_by_kind TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_revisions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id TEXT NOT NULL,
            topic_slug TEXT NOT NULL,
            blocks TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL,
            edit_summary TEXT,
            edited_by TEXT NOT NULL,
            edited_by_kind TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_revisions_document_id ON document_revisions(document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_revisions_document_version \
         ON document_revisions(document_id, version)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_revisions_created_at \
         ON document_revisions(created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
