//! HTTP client implementation

mod upload;

pub use upload::UploadBuilder;

use crate::backend::types::Transport;
use crate::backend::{Backend, BackendConfig};
use crate::body::Encoding;
use crate::logger::RequestLogger;
use crate::paging::{self, LoadMoreSignal, PagingCursor, PagingResponse, PagingState};
use crate::pipeline::retry::DEFAULT_RETRY_COUNT;
use crate::pipeline::{Pipeline, WorkerPool, pool::DEFAULT_CONCURRENCY};
use crate::{
    DefaultValidator, Error, Outcome, RawResponse, Reachability, Request, RequestBuilder,
    ResponseState, Result, Validate,
};
use futures_util::future::Either;
use futures_util::Stream;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How often a host that refused a connection is checked again
pub const DEFAULT_RECOVERY_INTERVAL: Duration = Duration::from_secs(2);

/// Recognized client options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Retries after the first attempt of a failed exchange
    pub retry_count: u32,
    /// Headers sent with every request
    pub headers: HeaderMap,
    /// Simultaneous in-flight exchanges
    pub max_concurrency: usize,
    /// Parameter encoding for GET and DELETE
    pub query_encoding: Encoding,
    /// Parameter encoding for POST, PUT and PATCH
    pub body_encoding: Encoding,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            headers,
            max_concurrency: DEFAULT_CONCURRENCY,
            query_encoding: Encoding::Query,
            body_encoding: Encoding::Json,
        }
    }
}

impl ClientOptions {
    /// Append or replace a default header
    pub fn add_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_ref().as_bytes())?;
        let value = HeaderValue::from_str(value.as_ref())?;
        self.headers.insert(name, value);
        Ok(())
    }
}

/// HTTP client resolving every call to a typed response state
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    pipeline: Pipeline,
    options: ClientOptions,
    base_url: Option<Url>,
}

impl Client {
    /// Create a new client with default configuration
    #[cfg(feature = "backend-reqwest")]
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a client builder
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Options in effect
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Base URL relative endpoints are resolved against
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    /// Worker pool bounding this client's in-flight exchanges
    pub fn worker_pool(&self) -> &WorkerPool {
        self.inner.pipeline.pool()
    }

    /// Reachability monitor consulted when requests fail
    pub fn reachability(&self) -> &Reachability {
        self.inner.pipeline.reachability()
    }

    /// Create a request builder with any method
    pub fn request(&self, method: Method, endpoint: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), method, endpoint)
    }

    /// Create a GET request
    pub fn get(&self, endpoint: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, endpoint)
    }

    /// Create a POST request
    pub fn post(&self, endpoint: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, endpoint)
    }

    /// Create a PUT request
    pub fn put(&self, endpoint: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, endpoint)
    }

    /// Create a PATCH request
    pub fn patch(&self, endpoint: impl Into<String>) -> RequestBuilder {
        self.request(Method::PATCH, endpoint)
    }

    /// Create a DELETE request
    pub fn delete(&self, endpoint: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, endpoint)
    }

    /// Upload raw data or a file to `endpoint`, optionally observing progress
    pub fn upload(&self, endpoint: impl Into<String>) -> UploadBuilder {
        UploadBuilder::new(self.clone(), endpoint)
    }

    /// Run a request to a single terminal state.
    ///
    /// HTTP error codes and exhausted transport failures come back as state values. While the
    /// service is offline the call waits for the network to become reachable. Only fatal
    /// errors are returned as `Err`.
    pub async fn run<S: ResponseState>(&self, request: Request) -> Result<S> {
        self.run_with_retries(request, self.inner.options.retry_count)
            .await
    }

    /// [`run`](Self::run) with an explicit retry budget
    pub async fn run_with_retries<S: ResponseState>(
        &self,
        request: Request,
        retries: u32,
    ) -> Result<S> {
        self.inner.pipeline.execute(request, retries).await
    }

    /// Run a request, yielding an offline state each time the call suspends and then exactly
    /// one terminal state
    pub fn watch<S: ResponseState>(
        &self,
        request: Request,
    ) -> impl Stream<Item = Result<S>> + Send + 'static + use<S> {
        self.inner
            .pipeline
            .watch(request, self.inner.options.retry_count)
    }

    /// Load `endpoint` page by page.
    ///
    /// Each item is the accumulation of every page loaded so far. After an item is emitted
    /// the next page is requested only once `signal`'s [`LoadMore`](crate::LoadMore) fires.
    /// Dropping the stream cancels the chain.
    pub fn paginate<R, C>(
        &self,
        endpoint: &str,
        cursor: C,
        signal: LoadMoreSignal,
    ) -> impl Stream<Item = Result<PagingState<R>>> + Send + 'static + use<R, C>
    where
        R: PagingResponse,
        C: PagingCursor,
    {
        match self.get(endpoint).build() {
            Ok(request) => Either::Left(self.paginate_request(request, cursor, signal)),
            Err(error) => Either::Right(futures_util::stream::once(async move { Err(error) })),
        }
    }

    pub(crate) fn paginate_request<R, C>(
        &self,
        request: Request,
        cursor: C,
        signal: LoadMoreSignal,
    ) -> impl Stream<Item = Result<PagingState<R>>> + Send + 'static + use<R, C>
    where
        R: PagingResponse,
        C: PagingCursor,
    {
        paging::paginate(
            self.inner.pipeline.clone(),
            request,
            self.inner.options.retry_count,
            cursor,
            signal,
        )
    }

    /// Classify a response to `request` with this client's validator
    pub fn validate(&self, request: &Request, response: &RawResponse) -> Outcome {
        self.inner.pipeline.validate(request, response)
    }

    pub(crate) fn resolve_url(&self, endpoint: &str) -> Result<Url> {
        crate::request::resolve_url(self.inner.base_url.as_ref(), endpoint)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

/// Builder for creating clients
pub struct ClientBuilder {
    options: ClientOptions,
    base_url: Option<String>,
    backend: Option<Backend>,
    backend_config: BackendConfig,
    pool: Option<WorkerPool>,
    reachability: Option<Reachability>,
    validator: Option<Arc<dyn Validate>>,
    logger: Option<Arc<dyn RequestLogger>>,
    recovery_interval: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self {
            options: ClientOptions::default(),
            base_url: None,
            backend: None,
            backend_config: BackendConfig::default(),
            pool: None,
            reachability: None,
            validator: None,
            logger: None,
            recovery_interval: Some(DEFAULT_RECOVERY_INTERVAL),
        }
    }

    /// Replace all options at once.
    ///
    /// A pool chosen earlier is kept only if its size matches `options.max_concurrency`.
    pub fn options(mut self, options: ClientOptions) -> Self {
        if self
            .pool
            .as_ref()
            .is_some_and(|pool| pool.size() != options.max_concurrency)
        {
            self.pool = None;
        }
        self.options = options;
        self
    }

    /// Set the base URL for all requests
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the engine timeout for a single exchange
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.backend_config.timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.backend_config.user_agent = Some(user_agent.into());
        self
    }

    /// Add a default header
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.options.add_header(name, value)?;
        Ok(self)
    }

    /// Set the retry budget
    pub fn retry_count(mut self, retries: u32) -> Self {
        self.options.retry_count = retries;
        self
    }

    /// Give this client its own worker pool with `workers` slots
    pub fn max_concurrency(mut self, workers: usize) -> Self {
        self.options.max_concurrency = workers;
        self.pool = Some(WorkerPool::new(workers));
        self
    }

    /// Share an existing worker pool
    pub fn worker_pool(mut self, pool: WorkerPool) -> Self {
        self.options.max_concurrency = pool.size();
        self.pool = Some(pool);
        self
    }

    /// Set the encoding used for GET and DELETE parameters
    pub fn query_encoding(mut self, encoding: Encoding) -> Self {
        self.options.query_encoding = encoding;
        self
    }

    /// Set the encoding used for POST, PUT and PATCH parameters
    pub fn body_encoding(mut self, encoding: Encoding) -> Self {
        self.options.body_encoding = encoding;
        self
    }

    /// Use a specific backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use a custom HTTP engine
    pub fn transport(self, transport: impl Transport) -> Self {
        self.backend(Backend::custom(transport))
    }

    /// Use a specific reachability monitor instead of the process-wide one
    pub fn reachability(mut self, reachability: Reachability) -> Self {
        self.reachability = Some(reachability);
        self
    }

    /// Override response validation
    pub fn validator(mut self, validator: impl Validate + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Receive every outgoing request for diagnostics
    pub fn logger(mut self, logger: impl RequestLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// How often to retry the TCP connection to a host that refused one.
    ///
    /// When an exchange cannot connect, the reachability monitor is marked unreachable and
    /// the host is polled at this interval until it accepts a connection. `None` leaves
    /// reachability entirely to [`Reachability::set_reachable`]. Defaults to
    /// [`DEFAULT_RECOVERY_INTERVAL`].
    pub fn recovery_interval(mut self, interval: Option<Duration>) -> Self {
        self.recovery_interval = interval;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .map(|url| Url::parse(&url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}"))))
            .transpose()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => default_backend(self.backend_config)?,
        };

        let pool = self.pool.unwrap_or_else(|| {
            if self.options.max_concurrency == DEFAULT_CONCURRENCY {
                WorkerPool::shared()
            } else {
                WorkerPool::new(self.options.max_concurrency)
            }
        });

        let pipeline = Pipeline::new(
            backend,
            pool,
            self.reachability.unwrap_or_else(Reachability::shared),
            self.validator.unwrap_or_else(|| Arc::new(DefaultValidator)),
            self.logger,
            self.recovery_interval,
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                pipeline,
                options: self.options,
                base_url,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "backend-reqwest")]
fn default_backend(config: BackendConfig) -> Result<Backend> {
    Backend::reqwest_with_config(config)
}

#[cfg(not(feature = "backend-reqwest"))]
fn default_backend(_config: BackendConfig) -> Result<Backend> {
    Err(Error::Internal(
        "no HTTP engine configured; enable `backend-reqwest` or call `transport`".to_string(),
    ))
}
