// src/watch/probe.rs

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

/// Checks whether a path is currently open for writing by another process.
///
/// The production implementation is [`FsWriteProbe`]; tests substitute
/// scripted probes to exercise the retry path deterministically.
pub trait WriteLockProbe: Send + Sync {
    fn is_open_for_writing(&self, path: &Path) -> bool;
}

/// Best-effort probe using the file system itself.
///
/// Opening for append fails while another process holds an exclusive write
/// handle (the usual case on Windows, where the change events originate from
/// editors saving assets). A missing file reports "not locked" — the compile
/// will fail and be logged, which is preferable to retrying forever.
pub struct FsWriteProbe;

impl WriteLockProbe for FsWriteProbe {
    fn is_open_for_writing(&self, path: &Path) -> bool {
        match OpenOptions::new().append(true).open(path) {
            Ok(_) => false,
            Err(err) => matches!(
                err.kind(),
                ErrorKind::PermissionDenied | ErrorKind::WouldBlock
            ),
        }
    }
}
