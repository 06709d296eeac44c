//! Voice-query relay: appends dictated text to a Craft document.
//!
//! # Overview
//! One endpoint, `POST /craft-hackathon`, takes `{"query": "..."}`, fetches
//! the document root, inserts the query as markdown at the end of the root
//! page, and answers `{"status": "created", "query": "..."}`.
//!
//! # Design
//! The Craft client is blocking, so each request runs its two round-trips
//! on tokio's blocking pool. Failures become plain-text responses through
//! `AppError`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use craft_core::{ApiError, BlockingClient, FetchParams, InsertRequest, Position, Transport};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

pub const QUERY_PATH: &str = "/craft-hackathon";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the Blocks API, e.g. `https://connect.craft.do/links/<id>/api/v1`.
    pub api_url: String,
    pub bind_addr: String,
    /// Per-call bound on remote requests; none means the transport default.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CRAFT_API_URL is not set")]
    MissingApiUrl,
    #[error("CRAFT_TIMEOUT_SECS must be a whole number of seconds, got {0:?}")]
    InvalidTimeout(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("CRAFT_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingApiUrl)?;
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let timeout = match lookup("CRAFT_TIMEOUT_SECS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            ),
            None => None,
        };
        Ok(Self {
            api_url,
            bind_addr,
            timeout,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    pub query: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("failed to fetch document: {0}")]
    FetchRoot(#[source] ApiError),

    #[error("failed to add content: {0}")]
    Insert(#[source] ApiError),

    #[error("request worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            AppError::FetchRoot(_) | AppError::Insert(_) => StatusCode::BAD_GATEWAY,
            AppError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "query failed");
        } else {
            warn!(error = %self, "query rejected");
        }
        (status, self.to_string()).into_response()
    }
}

type SharedClient<T> = Arc<BlockingClient<T>>;

pub fn app<T>(api: BlockingClient<T>) -> Router
where
    T: Transport + Send + Sync + 'static,
{
    Router::new()
        .route(QUERY_PATH, post(handle_query::<T>))
        .with_state(Arc::new(api))
}

pub async fn run<T>(listener: TcpListener, api: BlockingClient<T>) -> Result<(), std::io::Error>
where
    T: Transport + Send + Sync + 'static,
{
    axum::serve(listener, app(api)).await
}

async fn handle_query<T>(
    State(api): State<SharedClient<T>>,
    body: Bytes,
) -> Result<Json<QueryResponse>, AppError>
where
    T: Transport + Send + Sync + 'static,
{
    let request: QueryRequest = serde_json::from_slice(&body).map_err(AppError::InvalidJson)?;
    info!(query = %request.query, "received query");

    let query = request.query.clone();
    tokio::task::spawn_blocking(move || append_query(&api, &query)).await??;

    Ok(Json(QueryResponse {
        status: "created".to_string(),
        query: request.query,
    }))
}

/// Insert `query` at the end of the document's root page.
///
/// Returns the id of the first inserted block, if the server reported one.
pub fn append_query<T: Transport>(
    api: &BlockingClient<T>,
    query: &str,
) -> Result<Option<String>, AppError> {
    let root = api
        .fetch_blocks(&FetchParams::root().depth(0))
        .map_err(AppError::FetchRoot)?;
    let inserted = api
        .insert_blocks(&InsertRequest::markdown(query, Position::end(&root.id)))
        .map_err(AppError::Insert)?;

    let block_id = inserted.first().map(|b| b.id.clone());
    match &block_id {
        Some(id) => info!(page = %root.id, block = %id, "added content"),
        None => warn!(page = %root.id, "insert succeeded but returned no blocks"),
    }
    Ok(block_id)
}
