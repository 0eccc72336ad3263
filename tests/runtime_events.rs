// tests/runtime_events.rs

mod common;

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assetgen::config::ConfigFile;
use assetgen::engine::{ChangeKind, DedupQueue, Runtime, RuntimeEvent, RetryPolicy};
use assetgen::exec::{build_compile_settings, Compiler};
use assetgen::watch::{ChangeEventFilter, WriteLockProbe};
use common::{CountdownProbe, FailingCompiler, NeverLocked, RecordingCompiler, RecordingSink};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn test_config() -> ConfigFile {
    let mut types = BTreeMap::new();
    for (ext, type_name) in [("tif", "Texture"), ("lua", "Script"), ("cgf", "Mesh")] {
        types.insert(ext.to_string(), type_name.to_string());
    }
    ConfigFile {
        types,
        ..Default::default()
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 100,
        initial_delay: Duration::from_millis(1),
        multiplier: 1.0,
        max_delay: Duration::from_millis(2),
    }
}

struct TestRig {
    tx: mpsc::Sender<RuntimeEvent>,
    handle: JoinHandle<assetgen::errors::Result<()>>,
    sink: RecordingSink,
    root: PathBuf,
    _dir: tempfile::TempDir,
}

/// Spin up a full coordinator loop around the given compiler and probe.
fn start_runtime(compiler: Arc<dyn Compiler>, probe: Arc<dyn WriteLockProbe>) -> TestRig {
    let dir = tempfile::tempdir().expect("creating temp asset root");
    let root = dir.path().canonicalize().expect("canonicalizing root");
    let cfg = test_config();

    let filter = ChangeEventFilter::from_config(&cfg, root.clone()).expect("building filter");
    let settings: Arc<str> = build_compile_settings(
        &cfg.types,
        &cfg.project.sidecar_suffix,
        &cfg.filter.skip_types,
    )
    .into();

    let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
    let queue = DedupQueue::new(fast_policy(), tx.clone());
    let sink = RecordingSink::default();

    let runtime = Runtime::new(
        filter,
        queue,
        compiler,
        probe,
        Box::new(sink.clone()),
        settings,
        rx,
        tx.clone(),
    );
    let handle = tokio::spawn(runtime.run());

    TestRig {
        tx,
        handle,
        sink,
        root,
        _dir: dir,
    }
}

async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn change_events_drive_a_batch_to_completion() {
    let compiler = Arc::new(RecordingCompiler::default());
    let rig = start_runtime(Arc::clone(&compiler) as Arc<dyn Compiler>, Arc::new(NeverLocked));

    for name in ["a.tif", "b.tif", "c.tif"] {
        rig.tx
            .send(RuntimeEvent::FileChanged {
                path: rig.root.join(name),
                kind: ChangeKind::Modified,
            })
            .await
            .unwrap();
    }

    wait_until("all three compiles", || compiler.call_count() == 3).await;

    // Let the completion events drain through the coordinator.
    tokio::time::sleep(Duration::from_millis(50)).await;

    rig.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    rig.handle.await.unwrap().unwrap();

    let compiled: HashSet<PathBuf> = compiler
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|input| input.clone().expect("per-file invocations carry a path"))
        .collect();
    let expected: HashSet<PathBuf> = ["a.tif", "b.tif", "c.tif"]
        .into_iter()
        .map(|name| rig.root.join(name))
        .collect();
    assert_eq!(compiled, expected);

    // One progress update per started job.
    let shown = rig.sink.calls.lock().unwrap();
    let labels: HashSet<String> = shown.iter().map(|(label, _)| label.clone()).collect();
    assert_eq!(shown.len(), 3);
    assert_eq!(
        labels,
        ["a.tif", "b.tif", "c.tif"]
            .into_iter()
            .map(String::from)
            .collect()
    );
}

#[tokio::test]
async fn batch_tracker_resets_between_batches() {
    let compiler = Arc::new(RecordingCompiler::default());
    let rig = start_runtime(Arc::clone(&compiler) as Arc<dyn Compiler>, Arc::new(NeverLocked));

    rig.tx
        .send(RuntimeEvent::FileChanged {
            path: rig.root.join("a.tif"),
            kind: ChangeKind::Modified,
        })
        .await
        .unwrap();
    wait_until("first compile", || compiler.call_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    rig.tx
        .send(RuntimeEvent::FileChanged {
            path: rig.root.join("b.tif"),
            kind: ChangeKind::Modified,
        })
        .await
        .unwrap();
    wait_until("second compile", || compiler.call_count() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    rig.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    rig.handle.await.unwrap().unwrap();

    // Each event ran in its own batch: both progress displays happened with
    // fresh counters (0 processed of 1), not carried over from the previous
    // batch.
    let shown = rig.sink.calls.lock().unwrap();
    assert_eq!(
        shown.as_slice(),
        &[("a.tif".to_string(), 0.0), ("b.tif".to_string(), 0.0)]
    );
}

#[tokio::test]
async fn locked_file_retries_then_compiles_once() {
    let compiler = Arc::new(RecordingCompiler::default());
    // Locked for the first two polls, free afterwards.
    let rig = start_runtime(
        Arc::clone(&compiler) as Arc<dyn Compiler>,
        Arc::new(CountdownProbe::new(2)),
    );

    rig.tx
        .send(RuntimeEvent::FileChanged {
            path: rig.root.join("hero.cgf"),
            kind: ChangeKind::Created,
        })
        .await
        .unwrap();

    wait_until("compile after retries", || compiler.call_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    rig.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    rig.handle.await.unwrap().unwrap();

    assert_eq!(compiler.call_count(), 1);
}

#[tokio::test]
async fn compile_failure_still_frees_the_key() {
    let compiler = Arc::new(FailingCompiler::default());
    let rig = start_runtime(Arc::clone(&compiler) as Arc<dyn Compiler>, Arc::new(NeverLocked));

    let path = rig.root.join("broken.tif");
    rig.tx
        .send(RuntimeEvent::FileChanged {
            path: path.clone(),
            kind: ChangeKind::Modified,
        })
        .await
        .unwrap();
    wait_until("first failed compile", || compiler.call_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The failed compile completed the task, so the next change for the same
    // path is accepted again rather than coalesced away.
    rig.tx
        .send(RuntimeEvent::FileChanged {
            path,
            kind: ChangeKind::Modified,
        })
        .await
        .unwrap();
    wait_until("second failed compile", || compiler.call_count() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    rig.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    rig.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn rejected_events_never_reach_the_compiler() {
    let compiler = Arc::new(RecordingCompiler::default());
    let rig = start_runtime(Arc::clone(&compiler) as Arc<dyn Compiler>, Arc::new(NeverLocked));

    // None of these survive the filter.
    for (name, kind) in [
        ("readme.txt", ChangeKind::Modified),
        (".autosave.tif", ChangeKind::Modified),
        ("gone.tif", ChangeKind::Removed),
    ] {
        rig.tx
            .send(RuntimeEvent::FileChanged {
                path: rig.root.join(name),
                kind,
            })
            .await
            .unwrap();
    }

    let kept = rig.root.join("kept.tif");
    rig.tx
        .send(RuntimeEvent::FileChanged {
            path: kept.clone(),
            kind: ChangeKind::Modified,
        })
        .await
        .unwrap();

    wait_until("the surviving compile", || compiler.call_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    rig.tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    rig.handle.await.unwrap().unwrap();

    let calls = compiler.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[Some(kept)]);
}
