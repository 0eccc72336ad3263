// src/engine/mod.rs

//! The change-driven task coordinator.
//!
//! This module ties together:
//! - the dedup task queue (at most one execution per path, bounded retry)
//! - the batch progress tracker (push/pop counters, lazy lifecycle)
//! - the coordinating event loop that reacts to:
//!   - file-change events from the watcher
//!   - job start/finish events from queue workers
//!   - shutdown signals

pub mod progress;
pub mod queue;
pub mod runtime;

pub use progress::{BatchProgress, LogProgressSink, ProgressSink};
pub use queue::{DedupQueue, RetryPolicy, TaskOutcome};
pub use runtime::{ChangeKind, Runtime, RuntimeEvent};
