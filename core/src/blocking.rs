//! One-call-one-round-trip client on top of `CraftClient` and a `Transport`.
//!
//! Every method builds the request, executes it once, and parses the
//! response. No retries, no caching: errors surface on the first failure.

use tracing::{debug, warn};

use crate::block::Block;
use crate::client::CraftClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    BatchOutcome, FetchParams, InsertRequest, MoveRequest, SearchMatch, SearchParams,
    UpdateRequest, UploadLink, UploadLinkRequest,
};

/// `CraftClient` paired with the transport that executes its requests.
///
/// Holds no mutable state; share one instance across threads when the
/// transport allows it (`UreqTransport` does).
#[derive(Debug, Clone)]
pub struct BlockingClient<T = UreqTransport> {
    client: CraftClient,
    transport: T,
}

impl BlockingClient<UreqTransport> {
    /// Client for `base_url` using a default pooled ureq agent.
    pub fn connect(base_url: &str) -> Self {
        Self::new(CraftClient::new(base_url), UreqTransport::new())
    }
}

impl<T: Transport> BlockingClient<T> {
    pub fn new(client: CraftClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &CraftClient {
        &self.client
    }

    pub fn fetch_blocks(&self, params: &FetchParams) -> Result<Block, ApiError> {
        let response = self.round_trip(self.client.build_fetch_blocks(params))?;
        self.client.parse_fetch_blocks(response)
    }

    pub fn fetch_blocks_markdown(&self, params: &FetchParams) -> Result<String, ApiError> {
        let response = self.round_trip(self.client.build_fetch_blocks_markdown(params))?;
        self.client.parse_fetch_blocks_markdown(response)
    }

    pub fn insert_blocks(&self, input: &InsertRequest) -> Result<Vec<Block>, ApiError> {
        let response = self.round_trip(self.client.build_insert_blocks(input)?)?;
        self.client.parse_insert_blocks(response)
    }

    pub fn update_blocks(&self, input: &UpdateRequest) -> Result<Vec<Block>, ApiError> {
        let response = self.round_trip(self.client.build_update_blocks(input)?)?;
        self.client.parse_update_blocks(response)
    }

    pub fn delete_blocks(&self, block_ids: &[String]) -> Result<BatchOutcome, ApiError> {
        let response = self.round_trip(self.client.build_delete_blocks(block_ids)?)?;
        let outcome = self.client.parse_delete_blocks(response)?;
        if outcome.partial {
            debug!(
                requested = block_ids.len(),
                deleted = outcome.ids.len(),
                "delete partially applied"
            );
        }
        Ok(outcome)
    }

    pub fn move_blocks(&self, input: &MoveRequest) -> Result<BatchOutcome, ApiError> {
        let response = self.round_trip(self.client.build_move_blocks(input)?)?;
        let outcome = self.client.parse_move_blocks(response)?;
        if outcome.partial {
            debug!(
                requested = input.block_ids.len(),
                moved = outcome.ids.len(),
                "move partially applied"
            );
        }
        Ok(outcome)
    }

    pub fn search(&self, params: &SearchParams) -> Result<Vec<SearchMatch>, ApiError> {
        let response = self.round_trip(self.client.build_search(params)?)?;
        self.client.parse_search(response)
    }

    pub fn generate_upload_url(&self, input: &UploadLinkRequest) -> Result<UploadLink, ApiError> {
        let response = self.round_trip(self.client.build_generate_upload_url(input)?)?;
        self.client.parse_generate_upload_url(response)
    }

    /// Store `bytes` at a link from `generate_upload_url`.
    ///
    /// `content_type` must match the MIME type the link was generated for.
    /// The object is only kept once a block references `link.raw_url`.
    pub fn upload_file(
        &self,
        link: &UploadLink,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), ApiError> {
        debug!(size = bytes.len(), content_type, "uploading file");
        let response = self
            .transport
            .put_bytes(&link.upload_url, content_type, bytes)?;
        if response.is_success() {
            Ok(())
        } else {
            Err(ApiError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            })
        }
    }

    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "sending request");
        match self.transport.execute(&request) {
            Ok(response) => {
                debug!(status = response.status, bytes = response.body.len(), "received response");
                Ok(response)
            }
            Err(err) => {
                warn!(method = request.method.as_str(), url = %request.url, error = %err, "request failed");
                Err(err)
            }
        }
    }
}
