// src/exec/settings.rs

//! Assembly of the compiler settings strings.
//!
//! The per-file settings string is built once from the configured
//! extension→type table and reused for every invocation:
//!
//! ```text
//! /overwriteextension=cryasset /assettypes="cgf,Mesh;lua,Script;"
//! ```
//!
//! Bulk mode encodes the job description and source directory instead:
//!
//! ```text
//! /job="tools/cryassets/rcjob_cryassets.xml" /src="/project/Assets"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

/// Build the per-file settings string from the extension→type table.
///
/// The fallback sidecar type has no source asset of its own, and Level
/// sidecars live next to the level folder rather than next to a file; both
/// are excluded here and from the watched-extension set.
pub fn build_compile_settings(
    types: &BTreeMap<String, String>,
    sidecar_suffix: &str,
    skip_types: &[String],
) -> String {
    let mut settings = format!("/overwriteextension={sidecar_suffix} /assettypes=\"");
    for (ext, type_name) in types {
        if is_skipped(type_name, sidecar_suffix, skip_types) {
            continue;
        }
        settings.push_str(ext);
        settings.push(',');
        settings.push_str(type_name);
        settings.push(';');
    }
    settings.push('"');
    settings
}

/// Extensions the watcher should care about: every configured extension whose
/// type survives the same exclusions as the settings string.
pub fn watched_extensions(
    types: &BTreeMap<String, String>,
    sidecar_suffix: &str,
    skip_types: &[String],
) -> Vec<String> {
    types
        .iter()
        .filter(|(_, type_name)| !is_skipped(type_name, sidecar_suffix, skip_types))
        .map(|(ext, _)| ext.to_ascii_lowercase())
        .collect()
}

/// Settings string for the "regenerate everything" bulk invocation.
pub fn build_bulk_settings(job_file: &Path, src_root: &Path) -> String {
    format!(
        "/job=\"{}\" /src=\"{}\"",
        job_file.display(),
        src_root.display()
    )
}

fn is_skipped(type_name: &str, sidecar_suffix: &str, skip_types: &[String]) -> bool {
    type_name.eq_ignore_ascii_case(sidecar_suffix)
        || skip_types
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(type_name))
}
