//! Reactive REST client for Rust
//!
//! Every call resolves to a typed *response state* instead of an error: HTTP error codes,
//! exhausted retries and loss of connectivity are all values the caller can render. While
//! the network is unreachable a call suspends and resumes on its own once connectivity
//! returns. Paginated endpoints are loaded page by page on demand, with each emission
//! carrying everything loaded so far.
//!
//! ```no_run
//! use statewire::{Client, DefaultState};
//!
//! # async fn demo() -> statewire::Result<()> {
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .build()?;
//!
//! let state: DefaultState = client
//!     .get("search")
//!     .params(serde_json::json!({ "q": "rust" }))?
//!     .run()
//!     .await?;
//!
//! if let Some(problem) = state.state.validation_problem() {
//!     println!("rejected: {}", String::from_utf8_lossy(problem));
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub use backend::types::{BackendRequest, BackendResponse, Transport};
pub use backend::{Backend, BackendConfig};
pub use body::{Body, Encoding};
pub use classify::{DefaultValidator, Outcome, Validate, classify};
pub use client::{
    Client, ClientBuilder, ClientOptions, DEFAULT_RECOVERY_INTERVAL, UploadBuilder,
};
pub use error::{CONNECT_FAILED, Error, Result};
pub use logger::{RequestLogger, TracingLogger};
pub use paging::{LoadMore, LoadMoreSignal, PagingCursor, PagingResponse, PagingState};
pub use pipeline::WorkerPool;
pub use pipeline::pool::DEFAULT_CONCURRENCY;
pub use pipeline::retry::DEFAULT_RETRY_COUNT;
pub use progress::{ProgressReporter, UploadProgress};
pub use reachability::{MonitorHandle, Reachability};
pub use request::{Request, RequestBuilder};
pub use response::RawResponse;
pub use state::{BaseState, DefaultState, ResponseState, ServiceState, StateError};

pub mod backend;
mod body;
mod classify;
mod client;
mod error;
mod logger;
mod paging;
mod pipeline;
mod progress;
mod reachability;
mod request;
mod response;
mod state;
