// src/watch/mod.rs

//! File watching and change classification.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`) on the asset
//!   root and bridging its events into the async world.
//! - Classifying change events: managed-root containment, hidden/temp
//!   markers, watched extensions, exclude globs, and the sidecar-existence
//!   rule.
//! - Probing whether a changed file is still open for writing.
//!
//! It does **not** know about the queue or the batch counters; it only turns
//! filesystem changes into regeneration decisions.

pub mod filter;
pub mod probe;
pub mod watcher;

pub use filter::{build_globset, ChangeEventFilter};
pub use probe::{FsWriteProbe, WriteLockProbe};
pub use watcher::{spawn_watcher, WatcherHandle};
