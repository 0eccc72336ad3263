// src/watch/watcher.rs

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{ChangeKind, RuntimeEvent};
use crate::errors::Result;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher on the asset root (recursive) and forward every
/// relevant change as `RuntimeEvent::FileChanged` to the coordinating loop.
///
/// The notify callback itself stays trivial — it only bridges into the async
/// world; classification (root containment, extensions, sidecar checks) is
/// the coordinator's job.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone()); // best-effort

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Err(err) = event_tx.send(event) {
                        // We can't log via tracing here easily, so fallback to stderr.
                        eprintln!("assetgen: failed to forward notify event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("assetgen: file watch error: {err}");
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    // Async task that consumes notify events and forwards them to the runtime.
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!("received notify event: {:?}", event);

            let Some(kind) = change_kind(&event.kind) else {
                continue;
            };

            // A rename event carries both legs; only the destination name can
            // need a sidecar.
            let paths: Vec<PathBuf> = if matches!(
                event.kind,
                EventKind::Modify(ModifyKind::Name(RenameMode::Both))
            ) {
                event.paths.last().cloned().into_iter().collect()
            } else {
                event.paths.clone()
            };

            for path in paths {
                if let Err(err) = runtime_tx
                    .send(RuntimeEvent::FileChanged { path, kind })
                    .await
                {
                    warn!("failed to send RuntimeEvent::FileChanged: {err}");
                    // If the runtime channel is closed, there's no point
                    // keeping the watcher loop alive.
                    return;
                }
            }
        }

        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Map a notify event kind onto the change taxonomy the filter understands.
///
/// Metadata-only and access events are dropped here; removals are forwarded
/// so the filter's rejection of them stays observable.
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
            Some(ChangeKind::RenamedTo)
        }
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}
