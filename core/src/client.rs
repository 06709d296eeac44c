//! Stateless HTTP request builder and response parser for the Blocks API.
//!
//! # Design
//! `CraftClient` holds only a `base_url` and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! List-returning endpoints wrap their payload in `{"items": [...]}`; those
//! go through `parse_items`, which decodes the envelope first and the typed
//! array second.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    BatchOutcome, DeleteRequest, FetchParams, InsertContent, InsertRequest, MoveRequest,
    SearchMatch, SearchParams, UpdateRequest, UploadLink, UploadLinkRequest,
};

const OK: u16 = 200;
const MULTI_STATUS: u16 = 207;

/// Synchronous, stateless client for the Craft Blocks API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. See `BlockingClient` for the variant that also
/// performs the round-trip.
#[derive(Debug, Clone)]
pub struct CraftClient {
    base_url: String,
}

impl CraftClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_fetch_blocks(&self, params: &FetchParams) -> HttpRequest {
        let mut query = fetch_query(params);
        if params.fetch_metadata {
            query.push(("fetchMetadata".to_string(), "true".to_string()));
        }
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url("/blocks"),
            query,
            headers: vec![accept("application/json")],
            body: None,
        }
    }

    /// Same endpoint as `build_fetch_blocks`, negotiated as markdown.
    /// `fetch_metadata` has no markdown rendering and is not sent.
    pub fn build_fetch_blocks_markdown(&self, params: &FetchParams) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url("/blocks"),
            query: fetch_query(params),
            headers: vec![accept("text/markdown")],
            body: None,
        }
    }

    pub fn build_insert_blocks(&self, input: &InsertRequest) -> Result<HttpRequest, ApiError> {
        let mut input = input.clone();
        if let InsertContent::Blocks(blocks) = &mut input.content {
            blocks.iter_mut().for_each(Block::strip_file_metadata);
        }
        self.json_request(HttpMethod::Post, "/blocks", &input)
    }

    pub fn build_update_blocks(&self, input: &UpdateRequest) -> Result<HttpRequest, ApiError> {
        if input.blocks.iter().any(|b| b.id.is_empty()) {
            return Err(ApiError::Construction(
                "every block in an update must carry its id".to_string(),
            ));
        }
        let mut input = input.clone();
        input.blocks.iter_mut().for_each(Block::strip_file_metadata);
        self.json_request(HttpMethod::Put, "/blocks", &input)
    }

    pub fn build_delete_blocks(&self, block_ids: &[String]) -> Result<HttpRequest, ApiError> {
        let input = DeleteRequest {
            block_ids: block_ids.to_vec(),
        };
        self.json_request(HttpMethod::Delete, "/blocks", &input)
    }

    pub fn build_move_blocks(&self, input: &MoveRequest) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, "/blocks/move", input)
    }

    pub fn build_search(&self, params: &SearchParams) -> Result<HttpRequest, ApiError> {
        if params.pattern.is_empty() {
            return Err(ApiError::Construction("search pattern is empty".to_string()));
        }
        let mut query = vec![("pattern".to_string(), params.pattern.clone())];
        if params.case_sensitive {
            query.push(("caseSensitive".to_string(), "true".to_string()));
        }
        if params.before_block_count > 0 {
            query.push(("beforeBlockCount".to_string(), params.before_block_count.to_string()));
        }
        if params.after_block_count > 0 {
            query.push(("afterBlockCount".to_string(), params.after_block_count.to_string()));
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.url("/blocks/search"),
            query,
            headers: vec![accept("application/json")],
            body: None,
        })
    }

    pub fn build_generate_upload_url(
        &self,
        input: &UploadLinkRequest,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/upload-link", input)
    }

    pub fn parse_fetch_blocks(&self, response: HttpResponse) -> Result<Block, ApiError> {
        check_status(&response, &[OK])?;
        decode(&response.body)
    }

    pub fn parse_fetch_blocks_markdown(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, &[OK])?;
        Ok(response.body)
    }

    pub fn parse_insert_blocks(&self, response: HttpResponse) -> Result<Vec<Block>, ApiError> {
        parse_items(&response, &[OK])
    }

    pub fn parse_update_blocks(&self, response: HttpResponse) -> Result<Vec<Block>, ApiError> {
        parse_items(&response, &[OK])
    }

    pub fn parse_delete_blocks(&self, response: HttpResponse) -> Result<BatchOutcome, ApiError> {
        parse_batch(&response)
    }

    pub fn parse_move_blocks(&self, response: HttpResponse) -> Result<BatchOutcome, ApiError> {
        parse_batch(&response)
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<Vec<SearchMatch>, ApiError> {
        parse_items(&response, &[OK])
    }

    pub fn parse_generate_upload_url(
        &self,
        response: HttpResponse,
    ) -> Result<UploadLink, ApiError> {
        check_status(&response, &[OK])?;
        decode(&response.body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: &str,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body =
            serde_json::to_string(input).map_err(|e| ApiError::Construction(e.to_string()))?;
        Ok(HttpRequest {
            method,
            url: self.url(path),
            query: Vec::new(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }
}

/// Generic `{"items": ...}` wrapper; `items` is decoded in a second pass.
/// A missing or `null` list decodes as empty.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    items: serde_json::Value,
}

/// Element of the delete and move envelopes.
#[derive(Deserialize)]
struct IdItem {
    id: String,
}

fn fetch_query(params: &FetchParams) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Some(id) = params.id.as_deref().filter(|id| !id.is_empty()) {
        query.push(("id".to_string(), id.to_string()));
    }
    if let Some(depth) = params.max_depth {
        query.push(("maxDepth".to_string(), depth.to_string()));
    }
    query
}

fn accept(media_type: &str) -> (String, String) {
    ("accept".to_string(), media_type.to_string())
}

/// Reject any status not in `accepted`, keeping the body for diagnostics.
fn check_status(response: &HttpResponse, accepted: &[u16]) -> Result<(), ApiError> {
    if accepted.contains(&response.status) {
        return Ok(());
    }
    Err(ApiError::UnexpectedStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn parse_items<T: DeserializeOwned>(
    response: &HttpResponse,
    accepted: &[u16],
) -> Result<Vec<T>, ApiError> {
    check_status(response, accepted)?;
    let envelope: Envelope = decode(&response.body)?;
    if envelope.items.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(envelope.items)
        .map_err(|e| ApiError::Decode(format!("items: {e}")))
}

fn parse_batch(response: &HttpResponse) -> Result<BatchOutcome, ApiError> {
    let items: Vec<IdItem> = parse_items(response, &[OK, MULTI_STATUS])?;
    Ok(BatchOutcome {
        ids: items.into_iter().map(|item| item.id).collect(),
        partial: response.status == MULTI_STATUS,
    })
}
