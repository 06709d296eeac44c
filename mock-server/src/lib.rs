//! In-memory stand-in for the Craft Blocks API, used by end-to-end tests.
//!
//! Serves the same routes and JSON shapes as the remote service: block
//! fetch/insert/update/delete/move, regex search, and pre-signed upload
//! links backed by a local `/uploads` store.

pub mod document;

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{
        header::{ACCEPT, CONTENT_TYPE, HOST},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub use document::{Block, DocError, Document, ROOT_ID};
use document::{blocks_from_markdown, PositionBody};

const FILE_METADATA: [&str; 2] = ["mimeType", "fileSize"];

#[derive(Debug)]
pub struct Upload {
    pub mime_type: String,
    pub bytes: Option<Bytes>,
}

#[derive(Debug)]
pub struct Store {
    pub document: Document,
    pub uploads: HashMap<String, Upload>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store {
        document: Document::new("Document"),
        uploads: HashMap::new(),
    }));
    Router::new()
        .route(
            "/blocks",
            get(fetch_blocks)
                .post(insert_blocks)
                .put(update_blocks)
                .delete(delete_blocks),
        )
        .route("/blocks/move", put(move_blocks))
        .route("/blocks/search", get(search))
        .route("/upload-link", post(upload_link))
        .route("/uploads/{key}", put(store_upload))
        .route("/raw/{key}", get(raw_upload))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

impl IntoResponse for DocError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            DocError::NotFound(id) => (StatusCode::NOT_FOUND, format!("block not found: {id}")),
            DocError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
            DocError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        (status, message).into_response()
    }
}

#[derive(Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

#[derive(Serialize)]
pub struct IdItem {
    pub id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub id: Option<String>,
    pub max_depth: Option<i64>,
    pub fetch_metadata: Option<bool>,
}

#[derive(Deserialize)]
pub struct InsertBody {
    pub blocks: Option<Vec<Block>>,
    pub markdown: Option<String>,
    pub position: PositionBody,
}

#[derive(Deserialize)]
pub struct UpdateBody {
    pub blocks: Vec<Block>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBody {
    pub block_ids: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub block_ids: Vec<String>,
    pub position: PositionBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub pattern: String,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub before_block_count: usize,
    #[serde(default)]
    pub after_block_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLinkBody {
    pub file_name: String,
    pub mime_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLinkReply {
    pub upload_url: String,
    pub raw_url: String,
}

async fn fetch_blocks(
    State(db): State<Db>,
    Query(query): Query<FetchQuery>,
    headers: HeaderMap,
) -> Result<Response, DocError> {
    let store = db.read().await;
    let id = query.id.unwrap_or_else(|| ROOT_ID.to_string());
    let depth = query.max_depth.and_then(|d| usize::try_from(d).ok());
    let wants_markdown = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/markdown"));

    if wants_markdown {
        let markdown = store
            .document
            .render_markdown(&id, depth)
            .ok_or(DocError::NotFound(id))?;
        return Ok(([(CONTENT_TYPE, "text/markdown")], markdown).into_response());
    }

    let mut tree = store
        .document
        .tree(&id, depth)
        .ok_or(DocError::NotFound(id))?;
    if !query.fetch_metadata.unwrap_or(false) {
        strip_file_metadata(&mut tree);
    }
    Ok(Json(tree).into_response())
}

async fn insert_blocks(
    State(db): State<Db>,
    Json(body): Json<InsertBody>,
) -> Result<Json<Items<Block>>, DocError> {
    let placement = body.position.placement()?;
    let mut blocks = match (body.blocks, body.markdown) {
        (Some(blocks), None) => blocks,
        (None, Some(markdown)) => blocks_from_markdown(&markdown),
        _ => {
            return Err(DocError::Invalid(
                "provide exactly one of blocks or markdown".to_string(),
            ))
        }
    };
    if blocks.is_empty() {
        return Err(DocError::Invalid("nothing to insert".to_string()));
    }

    let mut store = db.write().await;
    for block in &mut blocks {
        apply_file_metadata(block, &store.uploads);
    }
    let items = store.document.insert(blocks, &placement)?;
    debug!(count = items.len(), "inserted blocks");
    Ok(Json(Items { items }))
}

async fn update_blocks(
    State(db): State<Db>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Items<Block>>, DocError> {
    let mut store = db.write().await;
    let mut patches = body.blocks;
    for patch in &mut patches {
        apply_file_metadata(patch, &store.uploads);
    }
    let items = store.document.update(patches)?;
    Ok(Json(Items { items }))
}

async fn delete_blocks(
    State(db): State<Db>,
    Json(body): Json<DeleteBody>,
) -> (StatusCode, Json<Items<IdItem>>) {
    let deleted = db.write().await.document.delete(&body.block_ids);
    batch_reply(body.block_ids.len(), deleted)
}

async fn move_blocks(
    State(db): State<Db>,
    Json(body): Json<MoveBody>,
) -> Result<(StatusCode, Json<Items<IdItem>>), DocError> {
    let placement = body.position.placement()?;
    let moved = db
        .write()
        .await
        .document
        .move_blocks(&body.block_ids, &placement)?;
    Ok(batch_reply(body.block_ids.len(), moved))
}

async fn search(
    State(db): State<Db>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Items<document::SearchHit>>, DocError> {
    let pattern = RegexBuilder::new(&query.pattern)
        .case_insensitive(!query.case_sensitive)
        .build()
        .map_err(|e| DocError::Invalid(format!("invalid pattern: {e}")))?;
    let store = db.read().await;
    let items = store.document.search(
        &pattern,
        query.before_block_count,
        query.after_block_count,
    );
    Ok(Json(Items { items }))
}

async fn upload_link(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(body): Json<UploadLinkBody>,
) -> Result<Json<UploadLinkReply>, DocError> {
    if body.file_name.is_empty() {
        return Err(DocError::Invalid("fileName is required".to_string()));
    }
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let key = Uuid::new_v4().simple().to_string();
    let mime_type = body
        .mime_type
        .unwrap_or_else(|| guess_mime_type(&body.file_name).to_string());

    db.write().await.uploads.insert(
        key.clone(),
        Upload {
            mime_type,
            bytes: None,
        },
    );
    Ok(Json(UploadLinkReply {
        upload_url: format!("http://{host}/uploads/{key}"),
        raw_url: format!("http://{host}/raw/{key}"),
    }))
}

async fn store_upload(
    State(db): State<Db>,
    Path(key): Path<String>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<StatusCode, DocError> {
    let mut store = db.write().await;
    let upload = store
        .uploads
        .get_mut(&key)
        .ok_or_else(|| DocError::NotFound(key.clone()))?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != upload.mime_type {
        return Err(DocError::Invalid(format!(
            "content-type {content_type:?} does not match {:?}",
            upload.mime_type
        )));
    }
    if upload.bytes.is_some() {
        return Err(DocError::Conflict(format!("upload {key} already stored")));
    }
    upload.bytes = Some(bytes);
    Ok(StatusCode::OK)
}

async fn raw_upload(
    State(db): State<Db>,
    Path(key): Path<String>,
) -> Result<Response, DocError> {
    let store = db.read().await;
    let upload = store.uploads.get(&key);
    match upload.and_then(|u| u.bytes.clone().map(|b| (u.mime_type.clone(), b))) {
        Some((mime_type, bytes)) => Ok(([(CONTENT_TYPE, mime_type)], bytes).into_response()),
        None => Err(DocError::NotFound(key)),
    }
}

fn batch_reply(requested: usize, ids: Vec<String>) -> (StatusCode, Json<Items<IdItem>>) {
    let status = if ids.len() == requested {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    let items = ids.into_iter().map(|id| IdItem { id }).collect();
    (status, Json(Items { items }))
}

/// Drop client-supplied file metadata and fill it in from stored uploads.
fn apply_file_metadata(block: &mut Block, uploads: &HashMap<String, Upload>) {
    for key in FILE_METADATA {
        block.attributes.remove(key);
    }
    let stored = block
        .attributes
        .get("url")
        .and_then(Value::as_str)
        .and_then(|url| url.rsplit('/').next())
        .and_then(|key| uploads.get(key))
        .and_then(|u| u.bytes.as_ref().map(|b| (u.mime_type.clone(), b.len())));
    if let Some((mime_type, size)) = stored {
        block.attributes.insert("mimeType".to_string(), Value::from(mime_type));
        block.attributes.insert("fileSize".to_string(), Value::from(size as u64));
    }
    for child in &mut block.content {
        apply_file_metadata(child, uploads);
    }
}

fn strip_file_metadata(block: &mut Block) {
    for key in FILE_METADATA {
        block.attributes.remove(key);
    }
    for child in &mut block.content {
        strip_file_metadata(child);
    }
}

fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        _ => "application/octet-stream",
    }
}
