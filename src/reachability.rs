//! Network reachability monitor
//!
//! The monitor only publishes transitions. Platform glue pushes them with
//! [`Reachability::set_reachable`], or a TCP monitor started with
//! [`Reachability::spawn_monitor`] does it on hosts without a platform source. When a request
//! cannot connect at all, the pipeline marks the network unreachable and calls
//! [`Reachability::recover_via`], which polls the failing host until it answers again.

use futures_util::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

static SHARED: OnceLock<Reachability> = OnceLock::new();

/// Shared reachability state, cheap to clone
#[derive(Clone, Debug)]
pub struct Reachability {
    inner: Arc<watch::Sender<bool>>,
    recovering: Arc<AtomicBool>,
}

impl Reachability {
    /// Create a monitor that starts out reachable
    pub fn new() -> Self {
        Self::with_status(true)
    }

    /// Create a monitor with an explicit initial status
    pub fn with_status(reachable: bool) -> Self {
        let (tx, _rx) = watch::channel(reachable);
        Self {
            inner: Arc::new(tx),
            recovering: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The process-wide monitor used by clients that are not given one
    pub fn shared() -> Self {
        SHARED.get_or_init(Self::new).clone()
    }

    /// Current status
    pub fn is_reachable(&self) -> bool {
        *self.inner.borrow()
    }

    /// Publish the current status; only transitions wake waiters
    pub fn set_reachable(&self, reachable: bool) {
        let changed = self.inner.send_if_modified(|current| {
            if *current == reachable {
                return false;
            }
            *current = reachable;
            true
        });

        if changed {
            if reachable {
                info!("network became reachable");
            } else {
                warn!("network became unreachable");
            }
        }
    }

    /// Resolve once the network is reachable.
    ///
    /// Resolves immediately if it already is, so a recovery that raced the caller's
    /// subscription is not missed.
    pub async fn became_reachable(&self) {
        let mut rx = self.inner.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|reachable| *reachable).await;
    }

    /// Stream of unreachable-to-reachable transitions observed from now on
    pub fn events(&self) -> impl Stream<Item = ()> + Send + 'static + use<> {
        let mut rx = self.inner.subscribe();
        rx.mark_unchanged();
        futures_util::stream::unfold(rx, |mut rx| async move {
            loop {
                rx.changed().await.ok()?;
                if *rx.borrow_and_update() {
                    return Some(((), rx));
                }
            }
        })
    }

    /// Periodically try a TCP connect to `addr` (`host:port`) and publish the result.
    ///
    /// Monitoring stops when the returned handle is dropped.
    pub fn spawn_monitor(&self, addr: impl Into<String>, interval: Duration) -> MonitorHandle {
        let addr = addr.into();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let monitor = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let reachable = connects(&addr, interval).await;
                        debug!(%addr, reachable, "reachability check");
                        monitor.set_reachable(reachable);
                    }
                }
            }
        });

        MonitorHandle {
            _guard: token.drop_guard(),
        }
    }

    /// Mark the network unreachable until a TCP connect to `addr` succeeds again.
    ///
    /// Called when an exchange could not connect at all. At most one recovery loop runs per
    /// monitor; it also ends early if something else reports the network reachable.
    pub fn recover_via(&self, addr: impl Into<String>, interval: Duration) {
        if self.recovering.swap(true, Ordering::AcqRel) {
            return;
        }

        let addr = addr.into();
        self.set_reachable(false);
        let monitor = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = monitor.became_reachable() => break,
                    _ = ticker.tick() => {
                        if connects(&addr, interval).await {
                            debug!(%addr, "host answers again");
                            monitor.recovering.store(false, Ordering::Release);
                            monitor.set_reachable(true);
                            return;
                        }
                    }
                }
            }
            monitor.recovering.store(false, Ordering::Release);
        });
    }

    /// Whether a recovery loop started by [`recover_via`](Self::recover_via) is running
    pub fn is_recovering(&self) -> bool {
        self.recovering.load(Ordering::Acquire)
    }
}

async fn connects(addr: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

impl Default for Reachability {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a reachability monitor running
#[derive(Debug)]
pub struct MonitorHandle {
    _guard: DropGuard,
}

impl MonitorHandle {
    /// Stop monitoring
    pub fn stop(self) {}
}
