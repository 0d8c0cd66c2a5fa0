//! Read-only HTTP search API.
//!
//! Serves the index opened from `[storage].index_path` under the name of
//! its file (e.g. `index.sqlite`).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api` | List served indexes |
//! | `GET`  | `/api/{index}/_count` | Number of documents in the index |
//! | `POST` | `/api/{index}/_search` | Ranked search with `<mark>` fragments |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Search body:
//!
//! ```json
//! { "query": "kubernetes docker", "size": 10, "from": 0, "highlight": true }
//! ```
//!
//! Errors use `{ "error": { "code": "not_found", "message": "..." } }`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted, and preflight
//! `OPTIONS` requests are answered by the CORS layer.

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::SinkError;
use crate::models::{Highlight, QueryRequest, QueryResponse};
use crate::store::{IndexSink, SqliteSink};

#[derive(Clone)]
struct AppState {
    index_name: String,
    sink: Arc<SqliteSink>,
    default_limit: i64,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let sink = SqliteSink::open_read_only(&config.storage.index_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open index at {} (run `fidx init` or `fidx index` first)",
                config.storage.index_path.display()
            )
        })?;
    let state = AppState {
        index_name: index_name(config),
        sink: Arc::new(sink),
        default_limit: config.query.limit,
    };
    tracing::info!(
        "serving index {} from {}",
        state.index_name,
        config.storage.index_path.display()
    );

    let app = router(state);
    let bind_addr = &config.server.bind;
    println!("fidx server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api", get(handle_list_indexes))
        .route("/api/{index}/_count", get(handle_count))
        .route("/api/{index}/_search", post(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

fn index_name(config: &Config) -> String {
    config
        .storage
        .index_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index".to_string())
}

// ============ Errors ============

/// Failure of an API call, rendered as
/// `{ "error": { "code": ..., "message": ... } }`.
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<SinkError> for AppError {
    fn from(e: SinkError) -> Self {
        tracing::error!("index access failed: {}", e);
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match self {
            AppError::BadRequest(m) | AppError::NotFound(m) | AppError::Internal(m) => m,
        };
        let body = serde_json::json!({ "error": { "code": code, "message": message } });
        (status, Json(body)).into_response()
    }
}

impl AppState {
    fn check_index(&self, name: &str) -> Result<(), AppError> {
        if name != self.index_name {
            return Err(AppError::NotFound(format!("no such index: {}", name)));
        }
        Ok(())
    }
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

// ============ GET /api ============

#[derive(Serialize)]
struct IndexListResponse {
    status: String,
    indexes: Vec<String>,
}

async fn handle_list_indexes(State(state): State<AppState>) -> Json<IndexListResponse> {
    Json(IndexListResponse {
        status: "ok".to_string(),
        indexes: vec![state.index_name.clone()],
    })
}

// ============ GET /api/{index}/_count ============

#[derive(Serialize)]
struct CountResponse {
    status: String,
    count: i64,
}

async fn handle_count(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> Result<Json<CountResponse>, AppError> {
    state.check_index(&index)?;
    let count = state.sink.count().await?;
    Ok(Json(CountResponse {
        status: "ok".to_string(),
        count,
    }))
}

// ============ POST /api/{index}/_search ============

#[derive(Deserialize)]
struct SearchBody {
    query: String,
    size: Option<i64>,
    from: Option<i64>,
    #[serde(default = "default_true")]
    highlight: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct HitBody {
    id: String,
    score: f64,
    fragments: BTreeMap<String, Vec<String>>,
    fields: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SearchResponse {
    status: String,
    total_hits: i64,
    from: i64,
    hits: Vec<HitBody>,
}

impl From<QueryResponse> for SearchResponse {
    fn from(response: QueryResponse) -> Self {
        let hits = response
            .hits
            .into_iter()
            .map(|hit| HitBody {
                id: hit.id,
                score: hit.score,
                fragments: hit.fragments.into_iter().collect(),
                fields: hit.fields.into_iter().collect(),
            })
            .collect();
        SearchResponse {
            status: "ok".to_string(),
            total_hits: response.total,
            from: response.from,
            hits,
        }
    }
}

async fn handle_search(
    State(state): State<AppState>,
    Path(index): Path<String>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, AppError> {
    state.check_index(&index)?;

    if body.query.trim().is_empty() {
        return Err(AppError::BadRequest("query must not be empty".into()));
    }
    let limit = body.size.unwrap_or(state.default_limit);
    let from = body.from.unwrap_or(0);
    if limit < 1 || from < 0 {
        return Err(AppError::BadRequest(
            "size must be >= 1 and from must be >= 0".into(),
        ));
    }

    let request = QueryRequest {
        query: body.query,
        limit,
        from,
        highlight: body.highlight.then(Highlight::html),
    };
    let response = state.sink.query(&request).await?;
    Ok(Json(response.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, FileDocument};
    use tempfile::TempDir;

    async fn state(tmp: &TempDir) -> AppState {
        let path = tmp.path().join("index.sqlite");
        let writer = SqliteSink::open(&path).await.unwrap();
        let mut doc = FileDocument::shell(std::path::Path::new("/d/k8s.txt"), "text/plain", 30);
        doc.text = "running kubernetes in production".to_string();
        writer.put(&Document::File(doc)).await.unwrap();
        writer.close().await.unwrap();

        let sink = SqliteSink::open_read_only(&path).await.unwrap();
        AppState {
            index_name: "index.sqlite".to_string(),
            sink: Arc::new(sink),
            default_limit: 10,
        }
    }

    #[tokio::test]
    async fn lists_the_served_index() {
        let tmp = TempDir::new().unwrap();
        let Json(resp) = handle_list_indexes(State(state(&tmp).await)).await;
        assert_eq!(resp.indexes, vec!["index.sqlite"]);
    }

    #[tokio::test]
    async fn count_known_and_unknown_index() {
        let tmp = TempDir::new().unwrap();
        let st = state(&tmp).await;

        let Json(resp) = handle_count(State(st.clone()), Path("index.sqlite".into()))
            .await
            .ok()
            .unwrap();
        assert_eq!(resp.count, 1);

        let err = handle_count(State(st), Path("other".into()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_returns_marked_fragments() {
        let tmp = TempDir::new().unwrap();
        let body = SearchBody {
            query: "kubernetes".into(),
            size: None,
            from: None,
            highlight: true,
        };
        let Json(resp) = handle_search(
            State(state(&tmp).await),
            Path("index.sqlite".into()),
            Json(body),
        )
        .await
        .ok()
        .unwrap();

        assert_eq!(resp.total_hits, 1);
        assert_eq!(resp.hits[0].id, "/d/k8s.txt");
        assert!(resp.hits[0].fragments["text"][0].contains("<mark>kubernetes</mark>"));
    }

    #[tokio::test]
    async fn empty_query_is_bad_request() {
        let tmp = TempDir::new().unwrap();
        let body = SearchBody {
            query: "  ".into(),
            size: None,
            from: None,
            highlight: false,
        };
        let err = handle_search(
            State(state(&tmp).await),
            Path("index.sqlite".into()),
            Json(body),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn router_builds() {
        // route syntax is validated when the router is constructed
        let rt = tokio::runtime::Runtime::new().unwrap();
        let tmp = TempDir::new().unwrap();
        let st = rt.block_on(state(&tmp));
        let _ = router(st);
    }
}
