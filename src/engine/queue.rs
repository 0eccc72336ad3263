// src/engine/queue.rs

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::model::RetrySection;
use crate::engine::runtime::RuntimeEvent;

/// Result of one poll of a regeneration task.
///
/// - `Completed`: the task is finished (whether or not the compiler liked the
///   file); the key is released and the completion callback fires.
/// - `Retry`: the file is not ready yet (still open for writing); the key
///   stays owned by the queue and the task is polled again after a backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Retry,
}

/// Backoff curve applied between `Retry` outcomes.
///
/// The delay grows by `multiplier` per attempt up to `max_delay`, and the
/// total number of polls is capped by `max_attempts` so a file left open
/// forever cannot pin its key or wedge a batch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay: Duration::from_millis(250),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetrySection) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            multiplier: cfg.multiplier,
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }

    /// Delay to sleep after the given 1-based attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1).min(32) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor) as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

/// Deduplicating asynchronous work queue keyed by absolute file path.
///
/// `submit` is an atomic test-and-insert on the in-flight set: the first
/// submission for a key spawns a worker, later submissions for the same key
/// are no-ops until that worker completes. Distinct keys run concurrently on
/// the shared Tokio runtime.
///
/// Completion is reported to the coordinating loop as
/// [`RuntimeEvent::JobFinished`]; the queue never touches the batch counters
/// itself.
pub struct DedupQueue {
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
    retry: RetryPolicy,
    events_tx: mpsc::Sender<RuntimeEvent>,
}

impl DedupQueue {
    pub fn new(retry: RetryPolicy, events_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            retry,
            events_tx,
        }
    }

    /// Returns true if the key is currently executing or awaiting a retry.
    pub fn is_in_flight(&self, key: &Path) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight set lock poisoned")
            .contains(key)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .expect("in-flight set lock poisoned")
            .len()
    }

    /// Submit work for a key. Returns `true` if the work was accepted and a
    /// worker spawned, `false` if the key is already in flight (the pending
    /// worker covers the latest state, so the submission coalesces).
    ///
    /// Never blocks the producer: the membership check is one short lock
    /// acquisition and all real work happens on the spawned worker.
    pub fn submit<W, Fut>(&self, key: PathBuf, work: W) -> bool
    where
        W: Fn(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        {
            // Test and insert under one lock so two submissions for the same
            // key can never both observe "absent".
            let mut in_flight = self.in_flight.lock().expect("in-flight set lock poisoned");
            if !in_flight.insert(key.clone()) {
                debug!(path = %key.display(), "key already in flight; submission coalesced");
                return false;
            }
        }

        let in_flight = Arc::clone(&self.in_flight);
        let retry = self.retry.clone();
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            let mut attempt: u32 = 1;
            loop {
                match work(key.clone()).await {
                    TaskOutcome::Completed => break,
                    TaskOutcome::Retry => {
                        if attempt >= retry.max_attempts {
                            warn!(
                                path = %key.display(),
                                attempts = attempt,
                                "file never became ready; giving up on this change"
                            );
                            break;
                        }
                        let delay = retry.delay_for(attempt);
                        debug!(
                            path = %key.display(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "file not ready, retrying"
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                }
            }

            in_flight
                .lock()
                .expect("in-flight set lock poisoned")
                .remove(&key);

            let _ = events_tx.send(RuntimeEvent::JobFinished { path: key }).await;
        });

        true
    }
}
