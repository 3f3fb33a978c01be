//! Bounded worker pool used as admission control for network operations

use crate::{Error, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default number of simultaneous in-flight exchanges
pub const DEFAULT_CONCURRENCY: usize = 2;

static SHARED: OnceLock<WorkerPool> = OnceLock::new();

/// A fixed number of worker slots shared by every call chain that holds a clone.
///
/// A slot is held for one dispatch and its classification, never across a wait for
/// reachability or for a load-more trigger.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool with `size` slots (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// The process-wide pool with [`DEFAULT_CONCURRENCY`] slots
    pub fn shared() -> Self {
        SHARED
            .get_or_init(|| Self::new(DEFAULT_CONCURRENCY))
            .clone()
    }

    /// Number of slots
    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot; the slot is returned when the permit drops
    pub(crate) async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("worker pool closed".to_string()))
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}
