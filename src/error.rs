//! Typed errors for the document store.
//!
//! The HTTP layer maps these onto the wire contract: not-found variants to
//! 404, patch failures to 400, version conflicts to 409, everything else
//! to 500. All variants are produced before any durable write happens.

use thiserror::Error;

use crate::patch::PatchError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document exists for topic '{0}'")]
    DocumentNotFound(String),

    #[error("no revision with version {version} exists for topic '{topic}'")]
    RevisionNotFound { topic: String, version: i64 },

    /// The caller's `expected_version` precondition no longer holds.
    #[error("document version is {current}, expected {expected}")]
    VersionConflict { expected: i64, current: i64 },

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("stored block list is not valid JSON: {0}")]
    CorruptBlocks(#[from] serde_json::Error),

    #[error("invalid editor kind in storage: '{0}'")]
    CorruptEditorKind(String),
}
