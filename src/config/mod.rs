// src/config/mod.rs

//! Configuration loading and validation for assetgen.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like the type table and retry curve
//!   (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{CompilerSection, ConfigFile, FilterSection, ProjectSection, RetrySection};
pub use validate::validate_config;
