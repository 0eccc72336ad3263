// src/watch/filter.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::engine::ChangeKind;
use crate::errors::Result;
use crate::exec::settings::watched_extensions;

/// Decides whether a file-system event warrants a sidecar regeneration.
///
/// All checks are cheap and synchronous; the filter runs on the coordinating
/// loop, before anything is handed to the queue. The sidecar-existence check
/// happens here, once, and is deliberately not re-evaluated when the task
/// later retries on a write lock.
pub struct ChangeEventFilter {
    root: PathBuf,
    sidecar_suffix: String,
    watched_exts: HashSet<String>,
    always_refresh: HashSet<String>,
    exclude: Option<GlobSet>,
}

impl ChangeEventFilter {
    /// Build the filter from the validated configuration. `root` must be the
    /// absolute asset root the watcher observes.
    pub fn from_config(cfg: &ConfigFile, root: PathBuf) -> Result<Self> {
        let watched_exts = watched_extensions(
            &cfg.types,
            &cfg.project.sidecar_suffix,
            &cfg.filter.skip_types,
        )
        .into_iter()
        .collect();

        let always_refresh = cfg
            .filter
            .always_refresh
            .iter()
            .map(|ext| ext.to_ascii_lowercase())
            .collect();

        let exclude = if cfg.filter.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&cfg.filter.exclude)?)
        };

        Ok(Self {
            root,
            sidecar_suffix: cfg.project.sidecar_suffix.clone(),
            watched_exts,
            always_refresh,
            exclude,
        })
    }

    /// Classify one change event. Returns the absolute path to submit as a
    /// task key, or `None` if the event does not warrant regeneration.
    pub fn accept(&self, path: &Path, kind: ChangeKind) -> Option<PathBuf> {
        match kind {
            ChangeKind::Created | ChangeKind::RenamedTo | ChangeKind::Modified => {}
            _ => return None,
        }

        // Ignore events for files outside the managed asset root.
        let rel = path.strip_prefix(&self.root).ok()?;

        // Ignore files that start with a dot.
        let name = rel.file_name()?.to_string_lossy();
        if name.starts_with('.') {
            return None;
        }

        let ext = rel.extension()?.to_string_lossy().to_ascii_lowercase();
        if !self.watched_exts.contains(&ext) {
            return None;
        }

        if let Some(exclude) = &self.exclude {
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if exclude.is_match(&rel_str) {
                debug!(path = %rel_str, "change matches exclude pattern; skipping");
                return None;
            }
        }

        // An existing sidecar is treated as authoritative, except for types
        // that have no real editor to keep it fresh.
        let sidecar = self.sidecar_path(path);
        if sidecar.exists() && !self.always_refresh.contains(&ext) {
            debug!(
                path = %path.display(),
                "sidecar already present; skipping regeneration"
            );
            return None;
        }

        Some(path.to_path_buf())
    }

    /// Sidecar path for a source asset: the full file name plus the suffix.
    pub fn sidecar_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(&self.sidecar_suffix);
        PathBuf::from(name)
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    let set = builder.build().context("building exclude globset")?;
    Ok(set)
}
