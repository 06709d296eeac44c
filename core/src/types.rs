//! Request and response DTOs for the Craft Blocks API.
//!
//! # Design
//! These types mirror the remote schema but are defined independently from
//! the mock-server crate; integration tests catch schema drift. Invalid
//! combinations the wire format allows (both `pageId` and `siblingId`, both
//! `blocks` and `markdown`) are not representable here.

use serde::{Deserialize, Deserializer, Serialize};

use crate::block::Block;

/// Decode a list that the server may send as `null` or leave out.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where inserted or moved blocks land.
///
/// Serialized as `{"position": "end", "pageId": "..."}` or
/// `{"position": "after", "siblingId": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "position", rename_all = "lowercase")]
pub enum Position {
    Start {
        #[serde(rename = "pageId")]
        page_id: String,
    },
    End {
        #[serde(rename = "pageId")]
        page_id: String,
    },
    Before {
        #[serde(rename = "siblingId")]
        sibling_id: String,
    },
    After {
        #[serde(rename = "siblingId")]
        sibling_id: String,
    },
}

impl Position {
    pub fn start(page_id: impl Into<String>) -> Self {
        Position::Start { page_id: page_id.into() }
    }

    pub fn end(page_id: impl Into<String>) -> Self {
        Position::End { page_id: page_id.into() }
    }

    pub fn before(sibling_id: impl Into<String>) -> Self {
        Position::Before { sibling_id: sibling_id.into() }
    }

    pub fn after(sibling_id: impl Into<String>) -> Self {
        Position::After { sibling_id: sibling_id.into() }
    }

    /// The page or sibling id this position is relative to.
    pub fn target_id(&self) -> &str {
        match self {
            Position::Start { page_id } | Position::End { page_id } => page_id,
            Position::Before { sibling_id } | Position::After { sibling_id } => sibling_id,
        }
    }
}

/// Payload of an insert: structured blocks or a markdown string, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertContent {
    Blocks(Vec<Block>),
    Markdown(String),
}

/// Request payload for `POST /blocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRequest {
    #[serde(flatten)]
    pub content: InsertContent,
    pub position: Position,
}

impl InsertRequest {
    pub fn blocks(blocks: Vec<Block>, position: Position) -> Self {
        Self {
            content: InsertContent::Blocks(blocks),
            position,
        }
    }

    pub fn markdown(markdown: impl Into<String>, position: Position) -> Self {
        Self {
            content: InsertContent::Markdown(markdown.into()),
            position,
        }
    }
}

/// Request payload for `PUT /blocks`. Every block must carry its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub blocks: Vec<Block>,
}

/// Request payload for `DELETE /blocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub block_ids: Vec<String>,
}

/// Request payload for `PUT /blocks/move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub block_ids: Vec<String>,
    pub position: Position,
}

/// Query for `GET /blocks`.
///
/// The default fetches the whole document from the root without metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    /// Subtree root; `None` means the document root.
    pub id: Option<String>,
    /// Levels of children to include; `None` means unbounded.
    pub max_depth: Option<u32>,
    pub fetch_metadata: bool,
}

impl FetchParams {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn block(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_metadata(mut self) -> Self {
        self.fetch_metadata = true;
        self
    }
}

/// Query for `GET /blocks/search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Pattern in the server's regex dialect.
    pub pattern: String,
    pub case_sensitive: bool,
    pub before_block_count: u32,
    pub after_block_count: u32,
}

impl SearchParams {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            case_sensitive: false,
            before_block_count: 0,
            after_block_count: 0,
        }
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Include up to `before` and `after` neighbouring blocks per match.
    pub fn context(mut self, before: u32, after: u32) -> Self {
        self.before_block_count = before;
        self.after_block_count = after;
        self
    }
}

/// One search hit with its location and surrounding blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub block_id: String,
    #[serde(default)]
    pub markdown: String,
    /// Ancestor pages, document root first.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub page_block_path: Vec<PagePathElement>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub before_blocks: Vec<ContextBlock>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub after_blocks: Vec<ContextBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePathElement {
    pub id: String,
    /// Page title; empty for untitled pages.
    #[serde(default)]
    pub content: String,
}

/// Neighbouring block; `markdown` is empty for blocks without text, such as images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBlock {
    pub block_id: String,
    #[serde(default)]
    pub markdown: String,
}

/// Request payload for `POST /upload-link`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLinkRequest {
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A pre-signed upload target plus the permanent URL of the object.
///
/// `upload_url` expires after roughly an hour and accepts a single PUT.
/// Objects never referenced by a block are purged by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLink {
    pub upload_url: String,
    pub raw_url: String,
}

/// Result of a delete or move.
///
/// `partial` is set when the server answered 207: ids it could not find were
/// dropped from `ids` without an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Affected ids in the order the server returned them.
    pub ids: Vec<String>,
    pub partial: bool,
}

impl BatchOutcome {
    /// Requested ids the server did not report back.
    pub fn missing<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|id| !self.ids.contains(id))
            .map(String::as_str)
            .collect()
    }
}
