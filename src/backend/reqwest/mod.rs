//! Reqwest backend for cross-platform HTTP support

use crate::backend::types::{BackendRequest, BackendResponse, Transport};
use crate::body::Body;
use crate::progress::ProgressReporter;
use crate::{Error, Result};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};

/// Size of the pieces an upload body is streamed in
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Reqwest backend for cross-platform HTTP
#[derive(Clone, Debug)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    /// Create a new Reqwest backend
    pub fn new() -> Result<Self> {
        Self::with_config(crate::backend::BackendConfig::default())
    }

    /// Create a new Reqwest backend with configuration
    pub fn with_config(config: crate::backend::BackendConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create reqwest client: {}", e)))?;

        Ok(Self { client })
    }

    /// Execute an HTTP request using reqwest
    pub async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        let mut req_builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        match (request.body, request.progress) {
            (Body::Empty, _) => {}
            (body, Some(progress)) => {
                let bytes = body.to_bytes()?;
                req_builder = req_builder
                    .header(http::header::CONTENT_LENGTH, bytes.len())
                    .body(streamed(bytes, progress));
            }
            (body, None) => req_builder = req_builder.body(body.to_bytes()?),
        }

        let response = req_builder.send().await.map_err(Error::from_reqwest)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::from_reqwest)?;

        Ok(BackendResponse {
            status,
            headers,
            body,
        })
    }
}

/// Hand the body to reqwest in chunks, reporting each one as it is pulled
fn streamed(bytes: Bytes, progress: ProgressReporter) -> reqwest::Body {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
        .collect();

    let body = stream::iter(chunks).map(move |chunk| {
        progress.advance(chunk.len() as u64);
        Ok::<_, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(body)
}

#[async_trait::async_trait]
impl Transport for ReqwestBackend {
    async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        ReqwestBackend::execute(self, request).await
    }
}
