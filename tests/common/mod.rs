//! Scripted HTTP engine shared by the integration tests

#![allow(dead_code)]

use http::{HeaderMap, StatusCode};
use statewire::{BackendRequest, BackendResponse, Error, Reachability, Result, Transport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the engine does for one exchange
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with a status and body
    Reply(u16, String),
    /// Fail with a timeout while the network stays reachable
    Transient,
    /// Mark the network unreachable and fail the exchange
    Offline,
    /// Fail with an error the pipeline must not retry
    Fatal,
}

impl Step {
    pub fn ok(body: impl Into<String>) -> Self {
        Step::Reply(200, body.into())
    }
}

/// Plays back a script of steps, repeating the last one once the script runs out
#[derive(Clone)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    requests: Arc<Mutex<Vec<BackendRequest>>>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    reachability: Option<Reachability>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            requests: Arc::default(),
            calls: Arc::default(),
            in_flight: Arc::default(),
            peak: Arc::default(),
            reachability: None,
            delay: None,
        }
    }

    /// Flip this monitor to unreachable on [`Step::Offline`]
    pub fn with_reachability(mut self, reachability: Reachability) -> Self {
        self.reachability = Some(reachability);
        self
    }

    /// Hold every exchange open for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap_or_else(|| Step::ok("{}"))
        }
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let progress = request.progress.clone();
        self.requests.lock().unwrap().push(request);
        let step = self.next_step();

        // Send the body in two halves so observers see an intermediate value.
        if let Some(progress) = progress {
            let half = progress.total() / 2;
            progress.advance(half);
            tokio::time::sleep(Duration::from_millis(20)).await;
            progress.advance(progress.total() - half);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Step::Reply(status, body) => Ok(BackendResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers: HeaderMap::new(),
                body: body.into(),
            }),
            Step::Transient => Err(Error::Timeout),
            Step::Offline => {
                if let Some(reachability) = &self.reachability {
                    reachability.set_reachable(false);
                }
                Err(Error::Network {
                    code: -1009,
                    message: "The Internet connection appears to be offline.".to_string(),
                })
            }
            Step::Fatal => Err(Error::InvalidRequest("rejected by engine".to_string())),
        }
    }
}

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Wait until `condition` holds, polling the scheduler
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
