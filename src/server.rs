//! Page store HTTP server.
//!
//! Exposes the [`PageStore`] contract as a small JSON API, plus the
//! fact-check service and an optional static frontend.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`   | `/api/pages` | Create a page from `{ "content": ... }` (201) |
//! | `GET`    | `/api/pages/{id}` | Read a page |
//! | `PUT`    | `/api/pages/{id}` | Replace a page's content |
//! | `DELETE` | `/api/pages/{id}` | Delete a page, returns `{ "success": true }` |
//! | `POST`   | `/api/fact-check` | Fact-check `{ "text": ... }` |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "page not found: ..." } }
//! ```
//!
//! Error codes: `validation` (400), `invalid_id` (400), `not_found` (404),
//! `unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser editor
//! served from another origin can reach the API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use pagecheck_core::error::StoreError;
use pagecheck_core::factcheck::{FactCheckError, FactCheckResult, FactChecker};
use pagecheck_core::models::Page;
use pagecheck_core::store::PageStore;

use crate::config::Config;
use crate::factcheck::create_checker;
use crate::sqlite_store::SqlitePageStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn PageStore>,
    checker: Arc<dyn FactChecker>,
}

/// Starts the server on `[server].bind` backed by the SQLite store.
///
/// Runs migrations first, so a fresh database needs no separate `init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;

    let store: Arc<dyn PageStore> = Arc::new(SqlitePageStore::new(pool));
    let checker = create_checker(&config.fact_check)?;
    run_server_with(config, store, checker).await
}

/// Starts the server with caller-supplied store and fact checker.
pub async fn run_server_with(
    config: &Config,
    store: Arc<dyn PageStore>,
    checker: Arc<dyn FactChecker>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(store, checker, config.server.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "page server listening");
    if let Some(dir) = &config.server.static_dir {
        tracing::info!(dir = %dir.display(), "serving frontend");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(
    store: Arc<dyn PageStore>,
    checker: Arc<dyn FactChecker>,
    static_dir: Option<&FsPath>,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/api/pages", post(handle_create))
        .route(
            "/api/pages/{id}",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .route("/api/fact-check", post(handle_fact_check))
        .route("/health", get(handle_health));

    if let Some(dir) = static_dir {
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(cors).with_state(AppState { store, checker })
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

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(code = %self.code, "{}", self.message);
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn validation_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "validation".to_string(),
        message: message.into(),
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match err {
            StoreError::Validation(_) | StoreError::InvalidId(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<FactCheckError> for AppError {
    fn from(err: FactCheckError) -> Self {
        match err {
            FactCheckError::EmptyText | FactCheckError::Rejected(_) => {
                validation_error(err.to_string())
            }
            FactCheckError::Unavailable(_) => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "unavailable".to_string(),
                message: err.to_string(),
            },
        }
    }
}

// ============ /api/pages ============

/// Request body for create and update. `content` is optional here so a
/// missing value surfaces as a `validation` error rather than a rejection.
#[derive(Deserialize)]
struct PageRequest {
    #[serde(default)]
    content: Option<serde_json::Value>,
}

fn page_request(payload: Result<Json<PageRequest>, JsonRejection>) -> Result<PageRequest, AppError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| validation_error(rejection.body_text()))
}

async fn handle_create(
    State(state): State<AppState>,
    payload: Result<Json<PageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Page>), AppError> {
    let req = page_request(payload)?;
    let page = state.store.create(req.content).await?;
    tracing::info!(id = %page.id, "page created");
    Ok((StatusCode::CREATED, Json(page)))
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Page>, AppError> {
    Ok(Json(state.store.get(&id).await?))
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PageRequest>, JsonRejection>,
) -> Result<Json<Page>, AppError> {
    let req = page_request(payload)?;
    let page = state.store.update(&id, req.content).await?;
    tracing::info!(id = %page.id, updated_at = %page.updated_at, "page updated");
    Ok(Json(page))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.store.delete(&id).await?;
    tracing::info!(id = %id, "page deleted");
    Ok(Json(DeleteResponse { success: true }))
}

// ============ POST /api/fact-check ============

#[derive(Deserialize)]
struct FactCheckRequest {
    #[serde(default)]
    text: String,
}

async fn handle_fact_check(
    State(state): State<AppState>,
    payload: Result<Json<FactCheckRequest>, JsonRejection>,
) -> Result<Json<FactCheckResult>, AppError> {
    let Json(req) = payload.map_err(|rejection| validation_error(rejection.body_text()))?;
    let result = state.checker.check(&req.text).await?;
    Ok(Json(result))
}

// ============ GET /health ============

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
