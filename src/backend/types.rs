//! Shared types between backend implementations

use crate::body::Body;
use crate::progress::ProgressReporter;
use crate::{Request, Result};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use url::Url;

/// Engine-agnostic HTTP request
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// HTTP method for the request
    pub method: Method,
    /// URL for the request
    pub url: Url,
    /// Headers for the request
    pub headers: HeaderMap,
    /// Body content
    pub body: Body,
    /// Where to report how much of the body has been sent, if anyone is listening
    pub progress: Option<ProgressReporter>,
}

impl From<&Request> for BackendRequest {
    fn from(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            body: request.body().clone(),
            progress: request.progress().cloned(),
        }
    }
}

/// Engine-agnostic HTTP response with the body fully read
#[derive(Debug, Clone)]
pub struct BackendResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

/// An HTTP engine: sends a request and eventually yields a response or fails.
///
/// Transient failures must be reported as [`Error::Network`](crate::Error::Network) or
/// [`Error::Timeout`](crate::Error::Timeout); any other error is treated as fatal.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform one exchange
    async fn execute(&self, request: BackendRequest) -> Result<BackendResponse>;
}
