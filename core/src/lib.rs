//! Synchronous API client core for the Craft Blocks API.
//!
//! # Overview
//! `CraftClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network (host-does-IO pattern). `BlockingClient`
//! pairs it with a `Transport` to perform exactly one round-trip per call.
//!
//! # Design
//! - `CraftClient` is stateless: it holds only `base_url`.
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and every request shape is unit-testable.
//! - List responses arrive wrapped in `{"items": [...]}` and are unwrapped by
//!   a single generic helper.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod block;
pub mod blocking;
pub mod client;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use block::{Block, BlockType, TextStyle, Width};
pub use blocking::BlockingClient;
pub use client::CraftClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    BatchOutcome, ContextBlock, DeleteRequest, FetchParams, InsertContent, InsertRequest,
    MoveRequest, PagePathElement, Position, SearchMatch, SearchParams, UpdateRequest, UploadLink,
    UploadLinkRequest,
};
