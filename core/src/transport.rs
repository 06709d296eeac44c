//! Executes plain-data requests over the network.
//!
//! # Design
//! `Transport` is the only seam between `CraftClient`'s pure request/response
//! values and real I/O. `UreqTransport` wraps a pooled `ureq::Agent` with
//! status-as-error disabled, so every HTTP status comes back as data and the
//! client alone decides what counts as success.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Something that can perform one HTTP round-trip.
///
/// Implementations must return non-2xx statuses as `Ok(HttpResponse)` and
/// reserve `Err(ApiError::Transport)` for requests that never completed.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;

    /// PUT raw bytes to a pre-signed URL.
    fn put_bytes(
        &self,
        url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }

    fn put_bytes(
        &self,
        url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<HttpResponse, ApiError> {
        (**self).put_bytes(url, content_type, bytes)
    }
}

/// Blocking transport backed by `ureq`.
///
/// Cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Bound every call, connect through body read, by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let body = request.body.as_deref();
        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(&request.url), request).call(),
            HttpMethod::Delete => {
                let builder = prepare(self.agent.delete(&request.url), request);
                match body {
                    Some(body) => builder.force_send_body().send(body.as_bytes()),
                    None => builder.call(),
                }
            }
            HttpMethod::Post => {
                let builder = prepare(self.agent.post(&request.url), request);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = prepare(self.agent.put(&request.url), request);
                match body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        into_response(result)
    }

    fn put_bytes(
        &self,
        url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<HttpResponse, ApiError> {
        let result = self
            .agent
            .put(url)
            .header("content-type", content_type)
            .send(bytes);
        into_response(result)
    }
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn into_response(
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<HttpResponse, ApiError> {
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    // Whole-tree fetches have no size bound; lift ureq's 10 MiB default.
    let body = response
        .body_mut()
        .with_config()
        .limit(u64::MAX)
        .read_to_string()
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}
