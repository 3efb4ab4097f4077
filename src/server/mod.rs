//! Remote table server.
//!
//! Serves the PostgREST subset the sync client speaks:
//!
//! - `GET    /rest/v1/{table}?select=..&order=<col>.<dir>&limit=..`
//! - `POST   /rest/v1/{table}` with a row or an array of rows
//! - `PATCH  /rest/v1/{table}?id=eq.<id>` with the changed fields
//! - `DELETE /rest/v1/{table}?id=eq.<id>`
//! - `GET    /health` (no auth)
//!
//! Requests authenticate with an `apikey` header or `Authorization: Bearer`.
//! With no keys configured every request is accepted.

mod tables;

pub use tables::{ListQuery, Order, TableError, TableStore};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path as FsPath;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::models::Table;

/// API key entry in the server config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    api_keys: Vec<ApiKeyEntry>,
}

/// Accepted API keys, mapped to a display name for logging.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<String, String>,
}

impl ApiKeys {
    pub fn new(entries: Vec<ApiKeyEntry>) -> Self {
        Self {
            keys: entries.into_iter().map(|e| (e.key, e.name)).collect(),
        }
    }

    /// Loads keys from a YAML config file. A missing or unreadable file
    /// leaves the server open.
    pub fn load(config_path: &FsPath) -> Self {
        let entries = match std::fs::read_to_string(config_path) {
            Ok(contents) => match serde_yaml::from_str::<ConfigFile>(&contents) {
                Ok(config) => config.api_keys,
                Err(e) => {
                    tracing::warn!("Failed to parse config file: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
                Vec::new()
            }
        };

        let keys = Self::new(entries);
        if keys.is_open() {
            tracing::warn!("No API keys loaded - accepting unauthenticated requests");
        } else {
            tracing::info!("Loaded {} API key(s)", keys.keys.len());
        }
        keys
    }

    pub fn is_open(&self) -> bool {
        self.keys.is_empty()
    }

    fn validate(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub tables: TableStore,
    pub api_keys: Arc<ApiKeys>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: String) -> Response {
    (status, Json(ErrorBody { error, message })).into_response()
}

impl IntoResponse for TableError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            TableError::UnknownTable(_) => (StatusCode::NOT_FOUND, "unknown_table"),
            TableError::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            TableError::Conflict(_) => (StatusCode::CONFLICT, "duplicate_key"),
            TableError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        error_response(status, error, self.to_string())
    }
}

fn api_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get("apikey").and_then(|h| h.to_str().ok()) {
        return Some(key);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.api_keys.is_open() {
        return next.run(request).await;
    }

    let Some(key) = api_key(request.headers()) else {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "missing_auth",
            "apikey header or Bearer token required".to_string(),
        );
    };

    match state.api_keys.validate(key) {
        Some(name) => {
            tracing::debug!(client = name, "Authenticated request");
            next.run(request).await
        }
        None => error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_key",
            "Invalid API key".to_string(),
        ),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn parse_table(name: &str) -> Result<Table, TableError> {
    Table::from_str(name).map_err(|_| TableError::UnknownTable(name.to_string()))
}

/// Extracts `<id>` from an `id=eq.<id>` filter.
fn id_filter(params: &HashMap<String, String>) -> Result<&str, TableError> {
    params
        .get("id")
        .and_then(|f| f.strip_prefix("eq."))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TableError::Invalid("an id=eq.<id> filter is required".to_string()))
}

fn list_query(params: &HashMap<String, String>) -> Result<ListQuery, TableError> {
    let order = params.get("order").map(|o| Order::parse(o)).transpose()?;
    let limit = params
        .get("limit")
        .map(|l| {
            l.parse::<u32>()
                .map_err(|_| TableError::Invalid(format!("bad limit '{}'", l)))
        })
        .transpose()?;
    let select = params
        .get("select")
        .filter(|s| s.as_str() != "*")
        .map(|s| s.split(',').map(|c| c.trim().to_string()).collect());

    Ok(ListQuery {
        order,
        limit,
        select,
    })
}

async fn list_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, TableError> {
    let table = parse_table(&table)?;
    let query = list_query(&params)?;
    Ok(Json(state.tables.list(table, &query).await?))
}

async fn insert_rows(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(body): Json<Value>,
) -> Result<StatusCode, TableError> {
    let table = parse_table(&table)?;
    let rows = match body {
        Value::Array(rows) => rows,
        row => vec![row],
    };
    for row in &rows {
        state.tables.insert(table, row).await?;
    }
    tracing::info!(table = %table, "Inserted {} row(s)", rows.len());
    Ok(StatusCode::CREATED)
}

async fn update_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Result<StatusCode, TableError> {
    let table = parse_table(&table)?;
    let id = id_filter(&params)?;
    if !state.tables.update(table, id, &patch).await? {
        tracing::debug!(table = %table, id, "Update matched no rows");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_row(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<StatusCode, TableError> {
    let table = parse_table(&table)?;
    let id = id_filter(&params)?;
    if !state.tables.delete(table, id).await? {
        tracing::debug!(table = %table, id, "Delete matched no rows");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the server's router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/rest/v1/{table}",
            get(list_rows)
                .post(insert_rows)
                .patch(update_row)
                .delete(delete_row),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
