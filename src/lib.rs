// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{
    DedupQueue, LogProgressSink, ProgressSink, RetryPolicy, Runtime, RuntimeEvent,
};
use crate::errors::Result;
use crate::exec::compiler::{Compiler, CompilerInvoker};
use crate::exec::settings::{build_compile_settings, watched_extensions};
use crate::watch::filter::ChangeEventFilter;
use crate::watch::probe::{FsWriteProbe, WriteLockProbe};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - settings-string assembly
/// - queue / coordinator / progress sink
/// - file watcher
/// - Ctrl-C handling
///
/// With `--regenerate-all` it instead performs one bulk compiler run and
/// returns.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let asset_root = resolve_asset_root(&config_path, &cfg)?;
    let compiler: Arc<dyn Compiler> = Arc::new(CompilerInvoker::from_config(&cfg.compiler));

    if args.regenerate_all {
        let ok =
            exec::regenerate_all(compiler.as_ref(), &cfg.compiler.job_file, &asset_root).await?;
        if !ok {
            return Err(anyhow!("bulk metadata regeneration failed").into());
        }
        return Ok(());
    }

    let settings: Arc<str> = build_compile_settings(
        &cfg.types,
        &cfg.project.sidecar_suffix,
        &cfg.filter.skip_types,
    )
    .into();

    let filter = ChangeEventFilter::from_config(&cfg, asset_root.clone())?;

    // Coordinator event channel.
    let (events_tx, events_rx) = mpsc::channel::<RuntimeEvent>(256);

    let queue = DedupQueue::new(RetryPolicy::from_config(&cfg.retry), events_tx.clone());

    let _watcher_handle = watch::spawn_watcher(asset_root, events_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = events_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let probe: Arc<dyn WriteLockProbe> = Arc::new(FsWriteProbe);
    let sink: Box<dyn ProgressSink> = Box::new(LogProgressSink);

    let runtime = Runtime::new(
        filter, queue, compiler, probe, sink, settings, events_rx, events_tx,
    );
    runtime.run().await
}

/// Resolve the asset root against the directory containing the config file.
fn resolve_asset_root(config_path: &Path, cfg: &ConfigFile) -> Result<PathBuf> {
    let root = if cfg.project.root.is_absolute() {
        cfg.project.root.clone()
    } else {
        config_root_dir(config_path).join(&cfg.project.root)
    };
    Ok(root.canonicalize()?)
}

/// Figure out the directory relative paths are resolved from.
/// Currently: directory containing the config file, or `.`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Simple dry-run output: print the effective configuration.
fn print_dry_run(cfg: &ConfigFile) {
    println!("assetgen dry-run");
    println!("  project.root = {:?}", cfg.project.root);
    println!("  project.sidecar_suffix = {}", cfg.project.sidecar_suffix);
    println!("  compiler.executable = {}", cfg.compiler.executable);
    println!("  compiler.job_file = {:?}", cfg.compiler.job_file);
    println!();

    println!("types ({}):", cfg.types.len());
    for (ext, type_name) in cfg.types.iter() {
        println!("  - {ext} -> {type_name}");
    }
    println!();

    let settings = build_compile_settings(
        &cfg.types,
        &cfg.project.sidecar_suffix,
        &cfg.filter.skip_types,
    );
    println!("settings string:");
    println!("  {settings}");
    println!();

    let exts = watched_extensions(
        &cfg.types,
        &cfg.project.sidecar_suffix,
        &cfg.filter.skip_types,
    );
    println!("watched extensions: {exts:?}");
    println!("always refresh: {:?}", cfg.filter.always_refresh);
    if !cfg.filter.exclude.is_empty() {
        println!("exclude: {:?}", cfg.filter.exclude);
    }
    println!(
        "retry: up to {} attempts, {}ms..{}ms x{}",
        cfg.retry.max_attempts,
        cfg.retry.initial_delay_ms,
        cfg.retry.max_delay_ms,
        cfg.retry.multiplier
    );

    debug!("dry-run complete (no execution)");
}
