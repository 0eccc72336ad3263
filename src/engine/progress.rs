// src/engine/progress.rs

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// Consumer of progress updates: a short label and a fraction in `[0, 1]`.
///
/// Implementations must tolerate rapid repeated calls; the coordinator emits
/// one update per started job.
pub trait ProgressSink: Send + Sync {
    fn show(&self, label: &str, fraction: f32);
}

/// Default sink that reports progress through the log.
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn show(&self, label: &str, fraction: f32) {
        info!(
            item = %label,
            percent = (fraction * 100.0) as u32,
            "generating asset metadata"
        );
    }
}

/// Counters for one batch of sidecar regenerations.
///
/// `total_pushed` counts accepted submissions, `total_popped` counts finished
/// jobs; both only ever grow for the life of the batch, and
/// `total_popped <= total_pushed` holds at all times. The batch is done once
/// the counters meet (and at least one item was pushed — a fresh tracker is
/// never done).
///
/// The counters are atomics so `show_progress` may read them while pushes and
/// pops happen elsewhere; create/destroy decisions belong to the single
/// coordinating loop that owns the tracker.
pub struct BatchProgress {
    total_pushed: AtomicUsize,
    total_popped: AtomicUsize,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            total_pushed: AtomicUsize::new(0),
            total_popped: AtomicUsize::new(0),
        }
    }

    pub fn push_item(&self) {
        self.total_pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pop_item(&self) {
        self.total_popped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_pushed(&self) -> usize {
        self.total_pushed.load(Ordering::Relaxed)
    }

    pub fn total_popped(&self) -> usize {
        self.total_popped.load(Ordering::Relaxed)
    }

    pub fn is_done(&self) -> bool {
        let pushed = self.total_pushed();
        pushed > 0 && pushed == self.total_popped()
    }

    /// Fraction of the batch processed so far; 0.0 before the first push.
    pub fn fraction(&self) -> f32 {
        let pushed = self.total_pushed();
        if pushed == 0 {
            return 0.0;
        }
        self.total_popped() as f32 / pushed as f32
    }

    /// Emit the current state to the sink, labelled with the file name of the
    /// item being worked on.
    pub fn show_progress(&self, path: &Path, sink: &dyn ProgressSink) {
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        sink.show(&label, self.fraction());
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}
