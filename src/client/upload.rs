//! Uploads of raw data or files with progress reporting

use crate::body::Body;
use crate::progress::{ProgressReporter, UploadProgress};
use crate::{Client, Error, Request, ResponseState, Result};
use bytes::Bytes;
use futures_util::Stream;
use http::Method;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::path::PathBuf;

const OCTET_STREAM: &str = "application/octet-stream";

enum Source {
    Data(Bytes),
    File(PathBuf),
}

/// Builder for uploading a file or in-memory data.
///
/// The upload runs through the same pipeline as any other call: it takes a worker slot,
/// is retried on transient failures and suspends while the network is unreachable. The
/// body is sent as-is, `application/octet-stream` unless a `Content-Type` header is set.
///
/// # Examples
///
/// Upload from a file:
/// ```no_run
/// use statewire::{Client, DefaultState};
///
/// # async fn demo() -> statewire::Result<()> {
/// let client = Client::builder().base_url("https://api.example.com").build()?;
/// let state: DefaultState = client
///     .upload("avatars")
///     .from_file("./avatar.png")
///     .header("Content-Type", "image/png")?
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// Watch progress while uploading data:
/// ```no_run
/// use futures_util::StreamExt;
/// use statewire::{Client, DefaultState};
///
/// # async fn demo() -> statewire::Result<()> {
/// let client = Client::builder().base_url("https://api.example.com").build()?;
/// let mut updates = Box::pin(
///     client
///         .upload("logs")
///         .from_data(vec![0u8; 1 << 20])
///         .with_progress::<DefaultState>()
///         .await?,
/// );
/// while let Some(update) = updates.next().await {
///     let (state, progress) = update?;
///     println!("{:.0}%", progress.fraction() * 100.0);
///     if let Some(state) = state {
///         println!("done: {}", state.success);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct UploadBuilder {
    client: Client,
    endpoint: String,
    method: Method,
    headers: HeaderMap,
    source: Option<Source>,
}

impl UploadBuilder {
    pub(crate) fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            method: Method::POST,
            headers: HeaderMap::new(),
            source: None,
        }
    }

    /// HTTP method, `POST` by default
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Upload the contents of the file at `path`; replaces any data set earlier.
    ///
    /// The file is read when the upload starts.
    pub fn from_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(Source::File(path.into()));
        self
    }

    /// Upload `data`; replaces any file set earlier
    pub fn from_data(mut self, data: impl Into<Bytes>) -> Self {
        self.source = Some(Source::Data(data.into()));
        self
    }

    /// Add a header, replacing a default header of the same name
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())?;
        let value = HeaderValue::from_str(value.as_ref())?;
        self.headers.insert(name, value);
        Ok(self)
    }

    async fn build(self) -> Result<(Client, Request)> {
        let content = match self.source {
            Some(Source::Data(data)) => data,
            Some(Source::File(path)) => Bytes::from(tokio::fs::read(&path).await?),
            None => {
                return Err(Error::InvalidRequest(
                    "upload needs data or a file".to_string(),
                ));
            }
        };

        let mut headers = self.headers;
        headers
            .entry(CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(OCTET_STREAM));

        let request = self
            .client
            .request(self.method, self.endpoint)
            .headers(headers)
            .body(Body::bytes(content, OCTET_STREAM))
            .build()?;
        Ok((self.client, request))
    }

    /// Run the upload to a single terminal state
    pub async fn run<S: ResponseState>(self) -> Result<S> {
        let (client, request) = self.build().await?;
        client.run(request).await
    }

    /// Run the upload, yielding `(None, progress)` as the body is sent and finally
    /// `(Some(state), progress)`.
    ///
    /// Progress restarts from zero when an attempt is retried. Dropping the stream cancels
    /// the upload.
    pub async fn with_progress<S: ResponseState>(
        self,
    ) -> Result<impl Stream<Item = Result<(Option<S>, UploadProgress)>> + Send + 'static> {
        let (client, request) = self.build().await?;
        let total = request.body().to_bytes()?.len() as u64;
        let (reporter, progress) = ProgressReporter::new(total);
        let request = request.with_progress(reporter);

        let run = Box::pin(async move { client.run::<S>(request).await });

        Ok(futures_util::stream::unfold(
            Some((run, progress)),
            |state| async move {
                let (mut run, mut progress) = state?;
                tokio::select! {
                    biased;
                    result = &mut run => {
                        let last = *progress.borrow();
                        Some((result.map(|state| (Some(state), last)), None))
                    }
                    Ok(()) = progress.changed() => {
                        let current = *progress.borrow_and_update();
                        Some((Ok((None, current)), Some((run, progress))))
                    }
                }
            },
        ))
    }
}

impl std::fmt::Debug for UploadBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadBuilder")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
