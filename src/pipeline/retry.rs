//! Bounded, immediate retry stage

use crate::state::Settled;
use crate::Result;
use std::future::Future;
use tracing::debug;

/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// How many times a failed exchange is re-dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    /// Retries after the first attempt
    pub budget: u32,
    /// Whether an offline failure is retried at all
    pub retry_offline: bool,
}

impl RetryPolicy {
    pub(crate) fn new(budget: u32) -> Self {
        Self {
            budget,
            retry_offline: true,
        }
    }

    /// Policy for the attempt that follows a reachability recovery
    pub(crate) fn resumed(budget: u32) -> Self {
        Self {
            budget,
            retry_offline: false,
        }
    }
}

/// Run `attempt` until it settles on a non-error response or the budget is spent.
///
/// Retries are immediate. Fatal errors stop the loop and propagate unchanged.
pub(crate) async fn with_retries<F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<Settled>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Settled>>,
{
    let mut retries = 0;
    loop {
        let settled = attempt(retries).await?;

        let outcome = match &settled {
            Settled::Response(_) => return Ok(settled),
            Settled::Failed(outcome) => outcome,
        };

        if retries >= policy.budget || (outcome.is_offline() && !policy.retry_offline) {
            return Ok(settled);
        }

        retries += 1;
        debug!(attempt = retries + 1, %outcome, "retrying request");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Outcome, RawResponse};
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use std::cell::Cell;

    fn ok() -> Settled {
        Settled::Response(RawResponse::new(StatusCode::OK, HeaderMap::new(), "ok"))
    }

    fn server_error() -> Settled {
        Settled::Failed(Outcome::UnexpectedServerError(Bytes::new()))
    }

    #[tokio::test]
    async fn succeeds_on_last_allowed_attempt() {
        let calls = Cell::new(0);
        let settled = with_retries(RetryPolicy::new(3), |n| {
            calls.set(calls.get() + 1);
            async move { Ok(if n < 2 { server_error() } else { ok() }) }
        })
        .await
        .unwrap();

        assert!(matches!(settled, Settled::Response(_)));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = Cell::new(0);
        let settled = with_retries(RetryPolicy::new(3), |_| {
            calls.set(calls.get() + 1);
            async { Ok(server_error()) }
        })
        .await
        .unwrap();

        assert!(matches!(settled, Settled::Failed(Outcome::UnexpectedServerError(_))));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn zero_budget_is_a_single_attempt() {
        let calls = Cell::new(0);
        with_retries(RetryPolicy::new(0), |_| {
            calls.set(calls.get() + 1);
            async { Ok(server_error()) }
        })
        .await
        .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn resumed_policy_does_not_retry_offline() {
        let calls = Cell::new(0);
        let settled = with_retries(RetryPolicy::resumed(3), |_| {
            calls.set(calls.get() + 1);
            async { Ok(Settled::Failed(Outcome::Offline)) }
        })
        .await
        .unwrap();

        assert!(matches!(settled, Settled::Failed(Outcome::Offline)));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn fatal_errors_stop_immediately() {
        let calls = Cell::new(0);
        let result = with_retries(RetryPolicy::new(3), |_| {
            calls.set(calls.get() + 1);
            async { Err(Error::InvalidUrl("x".into())) }
        })
        .await;

        assert!(matches!(result, Err(Error::InvalidUrl(_))));
        assert_eq!(calls.get(), 1);
    }
}
