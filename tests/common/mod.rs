// tests/common/mod.rs

//! Shared fakes for integration tests: a recording compiler, scripted write
//! probes and a recording progress sink.

#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use assetgen::engine::ProgressSink;
use assetgen::errors::Result;
use assetgen::exec::{CompileOutcome, Compiler};
use assetgen::watch::WriteLockProbe;

/// Compiler fake that records every invocation and always succeeds.
#[derive(Default)]
pub struct RecordingCompiler {
    pub calls: Mutex<Vec<Option<PathBuf>>>,
}

impl RecordingCompiler {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Compiler for RecordingCompiler {
    fn compile<'a>(
        &'a self,
        input: Option<&'a Path>,
        _settings: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompileOutcome>> + Send + 'a>> {
        let input = input.map(Path::to_path_buf);
        Box::pin(async move {
            self.calls.lock().unwrap().push(input);
            Ok(CompileOutcome::Success)
        })
    }
}

/// Compiler fake that always reports a failed exit.
#[derive(Default)]
pub struct FailingCompiler {
    pub calls: Mutex<Vec<Option<PathBuf>>>,
}

impl FailingCompiler {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Compiler for FailingCompiler {
    fn compile<'a>(
        &'a self,
        input: Option<&'a Path>,
        _settings: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompileOutcome>> + Send + 'a>> {
        let input = input.map(Path::to_path_buf);
        Box::pin(async move {
            self.calls.lock().unwrap().push(input);
            Ok(CompileOutcome::Failed(1))
        })
    }
}

/// Probe that never reports a write lock.
pub struct NeverLocked;

impl WriteLockProbe for NeverLocked {
    fn is_open_for_writing(&self, _path: &Path) -> bool {
        false
    }
}

/// Probe that reports "locked" for a fixed number of polls, then "free".
pub struct CountdownProbe {
    remaining: AtomicU32,
}

impl CountdownProbe {
    pub fn new(locked_polls: u32) -> Self {
        Self {
            remaining: AtomicU32::new(locked_polls),
        }
    }
}

impl WriteLockProbe for CountdownProbe {
    fn is_open_for_writing(&self, _path: &Path) -> bool {
        if self.remaining.load(Ordering::SeqCst) > 0 {
            self.remaining.fetch_sub(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

/// Sink that records every `(label, fraction)` pair it is shown.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub calls: Arc<Mutex<Vec<(String, f32)>>>,
}

impl ProgressSink for RecordingSink {
    fn show(&self, label: &str, fraction: f32) {
        self.calls.lock().unwrap().push((label.to_string(), fraction));
    }
}
