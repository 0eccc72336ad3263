// src/config/validate.rs

use crate::config::model::ConfigFile;
use crate::errors::{AssetgenError, Result};
use crate::watch::filter::build_globset;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one `[types]` entry
/// - extensions and type names are well formed
/// - the sidecar suffix is well formed
/// - the retry curve cannot spin or shrink
/// - exclude globs compile
///
/// It does **not** verify that the compiler executable or the job file
/// actually exist; both are resolved at invocation time.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_types(cfg)?;
    validate_types(cfg)?;
    validate_project(cfg)?;
    validate_filter(cfg)?;
    validate_retry(cfg)?;
    Ok(())
}

fn config_error(msg: String) -> AssetgenError {
    AssetgenError::ConfigError(msg)
}

fn ensure_has_types(cfg: &ConfigFile) -> Result<()> {
    if cfg.types.is_empty() {
        return Err(config_error(
            "config must contain at least one [types] entry (extension = \"TypeName\")".into(),
        ));
    }
    Ok(())
}

fn validate_types(cfg: &ConfigFile) -> Result<()> {
    for (ext, type_name) in cfg.types.iter() {
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(config_error(format!(
                "[types] extension '{ext}' must be non-empty and alphanumeric, without a dot"
            )));
        }
        if *ext != ext.to_ascii_lowercase() {
            return Err(config_error(format!(
                "[types] extension '{ext}' must be lowercase"
            )));
        }
        if type_name.is_empty() {
            return Err(config_error(format!(
                "[types] entry '{ext}' has an empty type name"
            )));
        }
    }
    Ok(())
}

fn validate_project(cfg: &ConfigFile) -> Result<()> {
    let suffix = &cfg.project.sidecar_suffix;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(config_error(format!(
            "[project].sidecar_suffix '{suffix}' must be non-empty and alphanumeric, without a dot"
        )));
    }
    Ok(())
}

fn validate_filter(cfg: &ConfigFile) -> Result<()> {
    // Compile the globs once here so a typo fails at startup rather than
    // silently never matching.
    build_globset(&cfg.filter.exclude)?;
    Ok(())
}

fn validate_retry(cfg: &ConfigFile) -> Result<()> {
    let retry = &cfg.retry;
    if retry.max_attempts == 0 {
        return Err(config_error(
            "[retry].max_attempts must be >= 1 (got 0)".into(),
        ));
    }
    if retry.multiplier < 1.0 {
        return Err(config_error(format!(
            "[retry].multiplier must be >= 1.0 (got {})",
            retry.multiplier
        )));
    }
    if retry.initial_delay_ms == 0 {
        return Err(config_error(
            "[retry].initial_delay_ms must be >= 1 (got 0)".into(),
        ));
    }
    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(config_error(format!(
            "[retry].max_delay_ms ({}) must not be smaller than initial_delay_ms ({})",
            retry.max_delay_ms, retry.initial_delay_ms
        )));
    }
    Ok(())
}
