//! HTTP surface over the document store.
//!
//! # Endpoints
//!
//! | Method  | Path | Description |
//! |---------|------|-------------|
//! | `GET`   | `/topics/{slug}/document` | Current document |
//! | `POST`  | `/topics/{slug}/document` | Create or replace the document |
//! | `PATCH` | `/topics/{slug}/document` | Apply block edits and inserts |
//! | `GET`   | `/topics/{slug}/document/history` | Revisions, newest first |
//! | `POST`  | `/topics/{slug}/document/revert/{version}` | Revert to a prior version |
//! | `GET`   | `/health` | Health check (returns version) |
//!
//! # Editor identity
//!
//! Authentication lives upstream; mutating endpoints expect the resolved
//! identity in `X-Editor` (name) and `X-Editor-Kind` (`human` or `agent`)
//! headers and answer 401 without them.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no document exists for topic 'rust'" } }
//! ```
//!
//! Error codes: `bad_request` (400), `unauthorized` (401), `not_found`
//! (404), `conflict` (409), `internal` (500). A `conflict` means the
//! caller's `expected_version` went stale; re-read and retry.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; both browser clients
//! and agents talk to this API directly.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::error::StoreError;
use crate::migrate;
use crate::models::{Block, BlockInput, Document, Editor, EditorKind, Revision};
use crate::patch::{BlockEdit, BlockInsert};
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    /// History listing length when the caller gives no `limit`.
    pub history_limit: i64,
}

impl AppState {
    pub fn new(store: Arc<DocumentStore>, history_limit: i64) -> Self {
        Self {
            store,
            history_limit,
        }
    }
}

/// Builds the full router. Exposed separately from [`run_server`] so tests
/// can bind it to an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/topics/{slug}/document",
            get(handle_get_document)
                .post(handle_replace_document)
                .patch(handle_patch_document),
        )
        .route("/topics/{slug}/document/history", get(handle_history))
        .route(
            "/topics/{slug}/document/revert/{version}",
            post(handle_revert),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on the configured bind address. Runs the
/// (idempotent) migrations first so a fresh deployment can start serving
/// without a separate `cdoc init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let store = Arc::new(DocumentStore::new(
        pool,
        config.documents.default_format.clone(),
    ));
    let state = AppState::new(store, config.documents.history_limit);
    let app = router(state);

    println!("collabdoc server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn conflict(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::CONFLICT,
        code: "conflict".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::DocumentNotFound(_) | StoreError::RevisionNotFound { .. } => {
                not_found(err.to_string())
            }
            StoreError::Patch(_) => bad_request(err.to_string()),
            StoreError::VersionConflict { .. } => conflict(err.to_string()),
            StoreError::Db(_) | StoreError::CorruptBlocks(_) | StoreError::CorruptEditorKind(_) => {
                internal(err.to_string())
            }
        }
    }
}

// ============ Editor identity extractor ============

/// The already-resolved editor identity, read from request headers.
pub struct EditorIdentity(pub Editor);

impl<S> FromRequestParts<S> for EditorIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let name = parts
            .headers
            .get("x-editor")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| unauthorized("editor identity required: set the X-Editor header"))?;

        let kind_raw = parts
            .headers
            .get("x-editor-kind")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                unauthorized("editor identity required: set the X-Editor-Kind header")
            })?;

        let kind = EditorKind::parse(kind_raw).ok_or_else(|| {
            bad_request(format!(
                "unknown editor kind '{}': expected 'human' or 'agent'",
                kind_raw
            ))
        })?;

        Ok(EditorIdentity(Editor {
            name: name.to_string(),
            kind,
        }))
    }
}

// ============ Request / response bodies ============

#[derive(Deserialize)]
struct ReplaceRequest {
    blocks: Vec<BlockInput>,
    #[serde(default)]
    format: Option<String>,
    /// Optional precondition: reject with 409 if the stored version has
    /// moved past the one the caller read.
    #[serde(default)]
    expected_version: Option<i64>,
}

#[derive(Deserialize)]
struct PatchRequest {
    #[serde(default)]
    edits: Vec<BlockEdit>,
    #[serde(default)]
    inserts: Vec<BlockInsert>,
    #[serde(default)]
    edit_summary: Option<String>,
    #[serde(default)]
    expected_version: Option<i64>,
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

#[derive(Serialize)]
struct DocumentResponse {
    id: String,
    topic: String,
    blocks: Vec<Block>,
    version: i64,
    format: String,
    created_by: String,
    created_by_kind: EditorKind,
    last_edited_by: String,
    last_edited_by_kind: EditorKind,
    created_at: String, // ISO8601
    updated_at: String, // ISO8601
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            topic: doc.topic,
            blocks: doc.blocks,
            version: doc.version,
            format: doc.format,
            created_by: doc.created_by,
            created_by_kind: doc.created_by_kind,
            last_edited_by: doc.last_edited_by,
            last_edited_by_kind: doc.last_edited_by_kind,
            created_at: format_ts_iso(doc.created_at),
            updated_at: format_ts_iso(doc.updated_at),
        }
    }
}

#[derive(Serialize)]
struct RevisionResponse {
    id: i64,
    topic: String,
    blocks: Vec<Block>,
    version: i64,
    edit_summary: Option<String>,
    edited_by: String,
    edited_by_kind: EditorKind,
    created_at: String, // ISO8601
}

impl From<Revision> for RevisionResponse {
    fn from(rev: Revision) -> Self {
        Self {
            id: rev.id,
            topic: rev.topic,
            blocks: rev.blocks,
            version: rev.version,
            edit_summary: rev.edit_summary,
            edited_by: rev.edited_by,
            edited_by_kind: rev.edited_by_kind,
            created_at: format_ts_iso(rev.created_at),
        }
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = state.store.get(&slug).await?;
    Ok(Json(doc.into()))
}

async fn handle_replace_document(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    EditorIdentity(editor): EditorIdentity,
    Json(body): Json<ReplaceRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = state
        .store
        .create_or_replace(&slug, body.blocks, body.format, &editor, body.expected_version)
        .await?;
    Ok(Json(doc.into()))
}

async fn handle_patch_document(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    EditorIdentity(editor): EditorIdentity,
    Json(body): Json<PatchRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = state
        .store
        .patch(
            &slug,
            &body.edits,
            &body.inserts,
            body.edit_summary,
            &editor,
            body.expected_version,
        )
        .await?;
    Ok(Json(doc.into()))
}

async fn handle_history(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<RevisionResponse>>, AppError> {
    let limit = match params.limit {
        Some(limit) if limit >= 1 => limit,
        Some(limit) => return Err(bad_request(format!("limit must be >= 1, got {}", limit))),
        None => state.history_limit,
    };
    let revisions = state.store.history(&slug, limit).await?;
    Ok(Json(revisions.into_iter().map(Into::into).collect()))
}

async fn handle_revert(
    State(state): State<AppState>,
    Path((slug, version)): Path<(String, i64)>,
    EditorIdentity(editor): EditorIdentity,
) -> Result<Json<DocumentResponse>, AppError> {
    let doc = state.store.revert(&slug, version, &editor).await?;
    Ok(Json(doc.into()))
}
