//! Paginated loading driven by a load-more trigger
//!
//! [`paginate`] loads one page, emits everything accumulated so far, and then waits for the
//! caller to [`fire`](LoadMore::fire) before asking for the next page. The chain stops on an
//! error state, on an empty page, when the response says there is nothing more to load, or
//! when every [`LoadMore`] handle has been dropped.

use crate::pipeline::Pipeline;
use crate::{BaseState, RawResponse, Request, ResponseState, Result};
use futures_util::Stream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// Describes which page to load and how to get to the next one.
///
/// Serialized into the query string of each page request.
pub trait PagingCursor: Serialize + Clone + Send + Sync + 'static {
    /// Cursor for the page after this one
    fn next_page(&self) -> Self;
}

/// A decoded page of results
pub trait PagingResponse: DeserializeOwned + Send + 'static {
    /// Element type of the page
    type Item: Clone + Send + 'static;

    /// Items on this page, or everything loaded so far once accumulated
    fn items(&self) -> &[Self::Item];

    /// Mutable access used to replace the page's items with the accumulation
    fn items_mut(&mut self) -> &mut Vec<Self::Item>;

    /// Whether another page exists, judged against the current `items`
    fn can_load_more(&self) -> bool;

    /// Decode a `2xx` body
    fn decode(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

/// Response state for paginated calls
#[derive(Debug, Clone)]
pub struct PagingState<R> {
    /// Reachability and error information
    pub state: Option<BaseState>,
    /// Decoded page with the accumulated items
    pub response: Option<R>,
}

impl<R: PagingResponse> PagingState<R> {
    /// Items loaded so far
    pub fn items(&self) -> &[R::Item] {
        self.response.as_ref().map(R::items).unwrap_or_default()
    }

    /// Whether another page can be requested
    pub fn can_load_more(&self) -> bool {
        self.response.as_ref().is_some_and(R::can_load_more)
    }
}

impl<R: PagingResponse> ResponseState for PagingState<R> {
    fn from_base_state(state: BaseState) -> Self {
        Self {
            state: Some(state),
            response: None,
        }
    }

    fn from_response(response: RawResponse) -> Self {
        if !response.is_success() {
            return Self::from_base_state(BaseState::online());
        }

        match R::decode(response.body()) {
            Ok(decoded) => Self {
                state: Some(BaseState::online()),
                response: Some(decoded),
            },
            Err(error) => Self::from_base_state(BaseState::unexpected(error)),
        }
    }

    fn empty() -> Self {
        Self {
            state: None,
            response: None,
        }
    }

    fn base_state(&self) -> Option<&BaseState> {
        self.state.as_ref()
    }
}

/// Caller side of the load-more trigger
#[derive(Clone, Debug)]
pub struct LoadMore {
    tx: Arc<watch::Sender<u64>>,
}

/// Driver side of the load-more trigger
#[derive(Debug)]
pub struct LoadMoreSignal {
    rx: watch::Receiver<u64>,
}

impl LoadMore {
    /// Create a connected trigger pair
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (LoadMore, LoadMoreSignal) {
        let (tx, rx) = watch::channel(0);
        (LoadMore { tx: Arc::new(tx) }, LoadMoreSignal { rx })
    }

    /// Ask for the next page.
    ///
    /// Fires before the current page has been emitted are ignored, and repeated fires while
    /// the driver is idle request a single page.
    pub fn fire(&self) {
        self.tx.send_modify(|fired| *fired = fired.wrapping_add(1));
    }

    /// Whether a pagination chain is still listening
    pub fn is_observed(&self) -> bool {
        self.tx.receiver_count() > 0
    }
}

impl LoadMoreSignal {
    fn mark_seen(&mut self) {
        self.rx.borrow_and_update();
    }

    /// Wait for a fire after the last emission; `false` once every trigger is gone
    async fn fired(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

enum Step<R: PagingResponse, C> {
    Loading { cursor: C, loaded: Vec<R::Item> },
    WaitingForTrigger { cursor: C, loaded: Vec<R::Item> },
    Finished,
}

struct Driver<R: PagingResponse, C> {
    pipeline: Pipeline,
    request: Request,
    budget: u32,
    signal: LoadMoreSignal,
    step: Step<R, C>,
}

impl<R: PagingResponse, C: PagingCursor> Driver<R, C> {
    async fn next(&mut self) -> Option<Result<PagingState<R>>> {
        loop {
            match std::mem::replace(&mut self.step, Step::Finished) {
                Step::Finished => return None,
                Step::WaitingForTrigger { cursor, loaded } => {
                    trace!(loaded = loaded.len(), "waiting for load-more trigger");
                    if !self.signal.fired().await {
                        trace!("load-more trigger dropped, ending pagination");
                        return None;
                    }
                    self.step = Step::Loading {
                        cursor: cursor.next_page(),
                        loaded,
                    };
                }
                Step::Loading { cursor, loaded } => return Some(self.load(cursor, loaded).await),
            }
        }
    }

    async fn load(&mut self, cursor: C, loaded: Vec<R::Item>) -> Result<PagingState<R>> {
        let request = self.request.with_query(&cursor)?;
        let mut state: PagingState<R> = self.pipeline.execute(request, self.budget).await?;

        let Some(response) = state.response.as_mut() else {
            trace!("page carried no payload, ending pagination");
            return Ok(state);
        };

        if response.items().is_empty() {
            trace!(loaded = loaded.len(), "empty page, ending pagination");
            *response.items_mut() = loaded;
            return Ok(state);
        }

        let mut accumulated = loaded;
        accumulated.append(response.items_mut());
        *response.items_mut() = accumulated;

        self.signal.mark_seen();
        if response.can_load_more() {
            trace!(loaded = response.items().len(), "page loaded");
            // The emitted state owns its items, so the next page starts from a copy.
            self.step = Step::WaitingForTrigger {
                cursor,
                loaded: response.items().to_vec(),
            };
        } else {
            trace!(loaded = response.items().len(), "last page loaded");
        }
        Ok(state)
    }
}

/// Load `request` page by page starting at `cursor`.
///
/// Dropping the stream cancels the in-flight page, including any wait for a worker slot or
/// for reachability, and releases the trigger subscription.
pub(crate) fn paginate<R, C>(
    pipeline: Pipeline,
    request: Request,
    budget: u32,
    cursor: C,
    signal: LoadMoreSignal,
) -> impl Stream<Item = Result<PagingState<R>>> + Send + 'static
where
    R: PagingResponse,
    C: PagingCursor,
{
    let driver = Driver {
        pipeline,
        request,
        budget,
        signal,
        step: Step::Loading {
            cursor,
            loaded: Vec::new(),
        },
    };

    futures_util::stream::unfold(driver, |mut driver| async move {
        let item = driver.next().await?;
        Some((item, driver))
    })
}
