//! Upload progress reporting

use std::sync::Arc;
use tokio::sync::watch;

/// Bytes of a request body handed to the engine so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    /// Bytes sent in the current attempt
    pub completed: u64,
    /// Size of the body
    pub total: u64,
}

impl UploadProgress {
    /// Completed share in `0.0..=1.0`; an empty body counts as done
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }

    /// Whether the whole body has been sent
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Handle an engine uses to publish how much of the body it has sent.
///
/// Engines that never report still end at 100% once a response arrives.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<UploadProgress>>,
}

impl ProgressReporter {
    pub(crate) fn new(total: u64) -> (Self, watch::Receiver<UploadProgress>) {
        let (tx, rx) = watch::channel(UploadProgress {
            completed: 0,
            total,
        });
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Body size being reported against
    pub fn total(&self) -> u64 {
        self.tx.borrow().total
    }

    /// Record `bytes` more as sent
    pub fn advance(&self, bytes: u64) {
        self.tx.send_if_modified(|progress| {
            let completed = progress.completed.saturating_add(bytes).min(progress.total);
            let changed = completed != progress.completed;
            progress.completed = completed;
            changed
        });
    }

    /// A new attempt sends the body from the start
    pub(crate) fn restart(&self) {
        self.tx.send_if_modified(|progress| {
            let changed = progress.completed != 0;
            progress.completed = 0;
            changed
        });
    }

    pub(crate) fn finish(&self) {
        self.tx.send_if_modified(|progress| {
            let changed = progress.completed != progress.total;
            progress.completed = progress.total;
            changed
        });
    }
}
