// src/exec/bulk.rs

use std::path::Path;

use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::compiler::{CompileOutcome, Compiler};
use crate::exec::settings::build_bulk_settings;

/// Regenerate all metadata for the project in one compiler run.
///
/// This is a thin wrapper around the bulk form of the subprocess contract:
/// no input path, job description and source directory in the settings
/// string. Returns whether the compiler reported success.
pub async fn regenerate_all(
    compiler: &dyn Compiler,
    job_file: &Path,
    asset_root: &Path,
) -> Result<bool> {
    let settings = build_bulk_settings(job_file, asset_root);

    info!(
        job = %job_file.display(),
        src = %asset_root.display(),
        "regenerating all asset metadata"
    );

    match compiler.compile(None, &settings).await? {
        CompileOutcome::Success => Ok(true),
        CompileOutcome::Failed(code) => {
            warn!(exit_code = code, "bulk metadata regeneration failed");
            Ok(false)
        }
    }
}
