// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// root = "Assets"
/// sidecar_suffix = "cryasset"
///
/// [compiler]
/// executable = "rc"
/// job_file = "tools/cryassets/rcjob_cryassets.xml"
///
/// [types]
/// cgf = "Mesh"
/// lua = "Script"
/// wav = "Sound"
/// ogg = "Sound"
///
/// [filter]
/// always_refresh = ["lua", "xml", "mtl", "cdf"]
/// exclude = ["_bak/**"]
///
/// [retry]
/// max_attempts = 60
/// initial_delay_ms = 250
/// ```
///
/// All sections except `[types]` are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Asset root and sidecar naming from `[project]`.
    #[serde(default)]
    pub project: ProjectSection,

    /// External compiler invocation from `[compiler]`.
    #[serde(default)]
    pub compiler: CompilerSection,

    /// Extension→asset-type-name table from `[types]`.
    ///
    /// Keys are file extensions without the dot (e.g. `"cgf"`).
    #[serde(default)]
    pub types: BTreeMap<String, String>,

    /// Change-event filtering from `[filter]`.
    #[serde(default)]
    pub filter: FilterSection,

    /// Lock-retry backoff from `[retry]`.
    #[serde(default)]
    pub retry: RetrySection,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// The asset tree to watch, absolute or relative to the config file.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Suffix appended to a source file name to form its sidecar name
    /// (without the dot). `foo.tif` → `foo.tif.cryasset`.
    #[serde(default = "default_sidecar_suffix")]
    pub sidecar_suffix: String,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_sidecar_suffix() -> String {
    "cryasset".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            sidecar_suffix: default_sidecar_suffix(),
        }
    }
}

/// `[compiler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CompilerSection {
    /// The compiler executable to invoke for each changed file.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Job description file handed to the compiler in bulk mode.
    #[serde(default = "default_job_file")]
    pub job_file: PathBuf,
}

fn default_executable() -> String {
    "rc".to_string()
}

fn default_job_file() -> PathBuf {
    PathBuf::from("tools/cryassets/rcjob_cryassets.xml")
}

impl Default for CompilerSection {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            job_file: default_job_file(),
        }
    }
}

/// `[filter]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterSection {
    /// Extensions whose sidecars are refreshed even when one already exists.
    /// These asset types have no true editor keeping the sidecar current.
    #[serde(default = "default_always_refresh")]
    pub always_refresh: Vec<String>,

    /// Type names excluded from watching and from the settings string.
    /// Levels keep their sidecar next to the level folder, not the file.
    #[serde(default = "default_skip_types")]
    pub skip_types: Vec<String>,

    /// Glob patterns (relative to the asset root) that never trigger
    /// regeneration.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_always_refresh() -> Vec<String> {
    ["lua", "xml", "mtl", "cdf"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_skip_types() -> Vec<String> {
    vec!["Level".to_string()]
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            always_refresh: default_always_refresh(),
            skip_types: default_skip_types(),
            exclude: Vec::new(),
        }
    }
}

/// `[retry]` section.
///
/// Bounds the re-poll loop for files that are still open for writing when
/// their change event arrives.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Per-attempt delay growth factor; must be at least 1.0.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    60
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}
