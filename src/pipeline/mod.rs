//! Request execution pipeline
//!
//! One logical exchange is driven to a terminal state in two stages:
//!
//! 1. a bounded retry stage ([`retry`]) that re-dispatches failed attempts immediately, and
//! 2. a suspend stage that, when the retry stage settles on [`Outcome::Offline`], waits for
//!    the reachability monitor to report recovery and then tries again.
//!
//! Every dispatch takes a slot from the [`WorkerPool`] and gives it back before any waiting.
//! A transport failure counts as offline only while the reachability monitor says so; a
//! refused connection marks it unreachable until the host accepts connections again.

pub mod pool;
pub mod retry;

pub use pool::WorkerPool;

use crate::backend::Backend;
use crate::backend::types::BackendRequest;
use crate::logger::RequestLogger;
use crate::state::{Settled, into_state};
use crate::{
    BaseState, Error, Outcome, RawResponse, Reachability, Request, ResponseState, Result, Validate,
};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use retry::{RetryPolicy, with_retries};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Progress of one exchange as seen by observers
#[derive(Debug)]
pub(crate) enum Progress {
    /// The pipeline suspended until the network is reachable again
    Offline,
    /// Terminal result
    Settled(Settled),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    First,
    Resumed,
}

/// Shared execution context: engine, worker pool, reachability and hooks
#[derive(Clone)]
pub(crate) struct Pipeline {
    backend: Backend,
    pool: WorkerPool,
    reachability: Reachability,
    validator: Arc<dyn Validate>,
    logger: Option<Arc<dyn RequestLogger>>,
    recovery_interval: Option<Duration>,
}

impl Pipeline {
    pub(crate) fn new(
        backend: Backend,
        pool: WorkerPool,
        reachability: Reachability,
        validator: Arc<dyn Validate>,
        logger: Option<Arc<dyn RequestLogger>>,
        recovery_interval: Option<Duration>,
    ) -> Self {
        Self {
            backend,
            pool,
            reachability,
            validator,
            logger,
            recovery_interval,
        }
    }

    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub(crate) fn reachability(&self) -> &Reachability {
        &self.reachability
    }

    pub(crate) fn validate(&self, request: &Request, response: &RawResponse) -> Outcome {
        self.validator.validate(request, response)
    }

    /// Drive `request` to a single terminal state
    pub(crate) async fn execute<S: ResponseState>(&self, request: Request, budget: u32) -> Result<S> {
        let mut progress = std::pin::pin!(self.drive(request, budget));
        while let Some(step) = progress.next().await {
            match step? {
                Progress::Offline => continue,
                Progress::Settled(settled) => return Ok(into_state(settled)),
            }
        }
        Err(Error::Internal("pipeline finished without a result".to_string()))
    }

    /// Like [`execute`](Self::execute), but also yields an offline state each time the
    /// pipeline suspends
    pub(crate) fn watch<S: ResponseState>(
        &self,
        request: Request,
        budget: u32,
    ) -> impl Stream<Item = Result<S>> + Send + 'static + use<S> {
        self.drive(request, budget).map(|step| {
            step.map(|progress| match progress {
                Progress::Offline => S::from_base_state(BaseState::offline()),
                Progress::Settled(settled) => into_state(settled),
            })
        })
    }

    /// Stream of progress events ending with exactly one terminal event or a fatal error
    pub(crate) fn drive(
        &self,
        request: Request,
        budget: u32,
    ) -> impl Stream<Item = Result<Progress>> + Send + 'static + use<> {
        let pipeline = self.clone();
        futures_util::stream::unfold(Some(Phase::First), move |phase| {
            let pipeline = pipeline.clone();
            let request = request.clone();
            async move {
                let phase = phase?;
                if phase == Phase::Resumed {
                    pipeline.reachability.became_reachable().await;
                    info!(url = %request.url(), "network reachable, resuming request");
                }

                let policy = match phase {
                    Phase::First => RetryPolicy::new(budget),
                    Phase::Resumed => RetryPolicy::resumed(budget),
                };

                let (p, r) = (&pipeline, &request);
                match with_retries(policy, move |n| p.attempt(r, n)).await {
                    Err(error) => Some((Err(error), None)),
                    Ok(Settled::Failed(Outcome::Offline)) => {
                        warn!(url = %request.url(), "service offline, waiting for reachability");
                        Some((Ok(Progress::Offline), Some(Phase::Resumed)))
                    }
                    Ok(settled) => Some((Ok(Progress::Settled(settled)), None)),
                }
            }
        })
    }

    /// One dispatch through the worker pool, validated and classified
    async fn attempt(&self, request: &Request, retry: u32) -> Result<Settled> {
        let _permit = self.pool.acquire().await?;

        if let Some(logger) = &self.logger {
            logger.log(request);
        }
        debug!(
            attempt = retry + 1,
            method = %request.method(),
            url = %request.url(),
            "dispatching request"
        );

        let progress = request.progress();
        if let Some(progress) = progress {
            progress.restart();
        }

        let response = match self.backend.execute(BackendRequest::from(request)).await {
            Ok(response) => response,
            Err(error) if error.is_transient() => {
                let offline = if error.is_connect()
                    && let Some(interval) = self.recovery_interval
                    && let Some(addr) = host_addr(request.url())
                {
                    self.reachability.recover_via(addr, interval);
                    true
                } else {
                    !self.reachability.is_reachable()
                };
                let outcome = if offline {
                    Outcome::Offline
                } else {
                    Outcome::UnexpectedServerError(Bytes::from(error.to_string()))
                };
                debug!(%error, %outcome, "transport failure");
                return Ok(Settled::Failed(outcome));
            }
            Err(error) => return Err(error),
        };

        if let Some(progress) = progress {
            progress.finish();
        }

        let raw = RawResponse::new(response.status, response.headers, response.body);
        match self.validate(request, &raw) {
            Outcome::Passthrough(..) => Ok(Settled::Response(raw)),
            outcome => Ok(Settled::Failed(outcome)),
        }
    }
}

/// `host:port` of the target, for TCP reachability checks
fn host_addr(url: &Url) -> Option<String> {
    Some(format!("{}:{}", url.host_str()?, url.port_or_known_default()?))
}
