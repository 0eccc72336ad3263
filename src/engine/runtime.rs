// src/engine/runtime.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::progress::{BatchProgress, ProgressSink};
use crate::engine::queue::{DedupQueue, TaskOutcome};
use crate::errors::Result;
use crate::exec::compiler::{CompileOutcome, Compiler};
use crate::watch::filter::ChangeEventFilter;
use crate::watch::probe::WriteLockProbe;

/// Kind of file-system change, as far as this subsystem cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    RenamedTo,
    Modified,
    Removed,
}

/// Events consumed by the coordinating loop.
///
/// - the watcher sends `FileChanged`
/// - queue workers send `JobStarted` and `JobFinished`
/// - Ctrl-C handling sends `ShutdownRequested`
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    FileChanged { path: PathBuf, kind: ChangeKind },
    JobStarted { path: PathBuf },
    JobFinished { path: PathBuf },
    ShutdownRequested,
}

/// The coordinating context for sidecar regeneration.
///
/// Everything that touches the batch tracker's lifecycle or the progress sink
/// runs on this single event loop; lock probing and compiler invocations run
/// on queue workers. The tracker itself is an Absent | Active state machine:
/// `None` between batches, `Some` from the first accepted submission until
/// the counters meet.
pub struct Runtime {
    filter: ChangeEventFilter,
    queue: DedupQueue,
    batch: Option<BatchProgress>,
    sink: Box<dyn ProgressSink>,
    probe: Arc<dyn WriteLockProbe>,
    compiler: Arc<dyn Compiler>,
    settings: Arc<str>,
    events_rx: mpsc::Receiver<RuntimeEvent>,
    events_tx: mpsc::Sender<RuntimeEvent>,
}

impl Runtime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filter: ChangeEventFilter,
        queue: DedupQueue,
        compiler: Arc<dyn Compiler>,
        probe: Arc<dyn WriteLockProbe>,
        sink: Box<dyn ProgressSink>,
        settings: Arc<str>,
        events_rx: mpsc::Receiver<RuntimeEvent>,
        events_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            filter,
            queue,
            batch: None,
            sink,
            probe,
            compiler,
            settings,
            events_rx,
            events_tx,
        }
    }

    /// Main event loop. Runs until a shutdown is requested or every sender is
    /// gone.
    pub async fn run(mut self) -> Result<()> {
        info!("asset metadata coordinator started");

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "coordinator received event");

            let keep_running = match event {
                RuntimeEvent::FileChanged { path, kind } => {
                    self.handle_file_changed(path, kind);
                    true
                }
                RuntimeEvent::JobStarted { path } => {
                    self.handle_job_started(path);
                    true
                }
                RuntimeEvent::JobFinished { path } => {
                    self.handle_job_finished(path);
                    true
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested, stopping coordinator");
                    false
                }
            };

            if !keep_running {
                break;
            }
        }

        info!("asset metadata coordinator exiting");
        Ok(())
    }

    /// Run the change filter and, if the event warrants regeneration, hand a
    /// task to the dedup queue and account for it in the current batch.
    fn handle_file_changed(&mut self, path: PathBuf, kind: ChangeKind) {
        let Some(key) = self.filter.accept(&path, kind) else {
            return;
        };

        let probe = Arc::clone(&self.probe);
        let compiler = Arc::clone(&self.compiler);
        let settings = Arc::clone(&self.settings);
        let events_tx = self.events_tx.clone();

        let accepted = self.queue.submit(key.clone(), move |path| {
            let probe = Arc::clone(&probe);
            let compiler = Arc::clone(&compiler);
            let settings = Arc::clone(&settings);
            let events_tx = events_tx.clone();

            async move {
                // The file may still be open for writing; poll again later.
                if probe.is_open_for_writing(&path) {
                    return TaskOutcome::Retry;
                }

                let _ = events_tx
                    .send(RuntimeEvent::JobStarted { path: path.clone() })
                    .await;

                // A failed compile is logged and swallowed: it must not block
                // future regenerations of this path.
                match compiler.compile(Some(&path), &settings).await {
                    Ok(CompileOutcome::Success) => {}
                    Ok(CompileOutcome::Failed(code)) => {
                        warn!(
                            path = %path.display(),
                            exit_code = code,
                            "metadata compiler reported failure"
                        );
                    }
                    Err(err) => {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "failed to run metadata compiler"
                        );
                    }
                }

                TaskOutcome::Completed
            }
        });

        if accepted {
            // Absent -> Active on the first submission of a batch.
            let batch = self.batch.get_or_insert_with(BatchProgress::new);
            batch.push_item();
            debug!(
                path = %key.display(),
                queued = batch.total_pushed(),
                "queued sidecar regeneration"
            );
        }
    }

    fn handle_job_started(&mut self, path: PathBuf) {
        match self.batch.as_ref() {
            Some(batch) => batch.show_progress(&path, self.sink.as_ref()),
            // A job can only start after its push, and the tracker is only
            // dropped once every pushed job has finished.
            None => unreachable!("job started with no active batch"),
        }
    }

    fn handle_job_finished(&mut self, path: PathBuf) {
        let done = {
            let Some(batch) = self.batch.as_ref() else {
                unreachable!("job finished with no active batch");
            };
            batch.pop_item();
            debug!(
                path = %path.display(),
                processed = batch.total_popped(),
                total = batch.total_pushed(),
                "sidecar regeneration finished"
            );
            batch.is_done()
        };

        if done {
            // Active -> Absent; the next accepted submission starts a fresh
            // batch with counters at zero.
            if let Some(batch) = self.batch.take() {
                info!(
                    items = batch.total_pushed(),
                    "asset metadata batch complete"
                );
            }
        }
    }
}
