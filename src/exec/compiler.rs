// src/exec/compiler.rs

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::model::CompilerSection;
use crate::errors::Result;

/// Exit disposition of one compiler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    Success,
    Failed(i32), // exit code
}

/// Trait abstracting the external metadata compiler.
///
/// Production code uses [`CompilerInvoker`]; tests provide implementations
/// that record invocations without spawning real processes.
///
/// `input` of `None` selects bulk mode: the settings string must then encode
/// the job description and source directory itself.
pub trait Compiler: Send + Sync {
    fn compile<'a>(
        &'a self,
        input: Option<&'a Path>,
        settings: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompileOutcome>> + Send + 'a>>;
}

/// Invokes the configured compiler executable through the platform shell.
///
/// stdout and stderr are streamed into the log; the invocation is always
/// windowless, and `/quiet` / `/userdialog=0` are appended unless disabled.
pub struct CompilerInvoker {
    executable: String,
    silent: bool,
    suppress_dialogs: bool,
}

impl CompilerInvoker {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            silent: true,
            suppress_dialogs: true,
        }
    }

    pub fn from_config(cfg: &CompilerSection) -> Self {
        Self::new(cfg.executable.clone())
    }

    /// Assemble the full command line for an invocation.
    pub fn command_line(&self, input: Option<&Path>, settings: &str) -> String {
        let mut cmdline = self.executable.clone();
        if let Some(path) = input {
            cmdline.push_str(&format!(" \"{}\"", path.display()));
        }
        cmdline.push(' ');
        cmdline.push_str(settings);
        if self.silent {
            cmdline.push_str(" /quiet");
        }
        if self.suppress_dialogs {
            cmdline.push_str(" /userdialog=0");
        }
        cmdline
    }
}

impl Compiler for CompilerInvoker {
    fn compile<'a>(
        &'a self,
        input: Option<&'a Path>,
        settings: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<CompileOutcome>> + Send + 'a>> {
        let cmdline = self.command_line(input, settings);
        Box::pin(async move { run_compiler(cmdline).await })
    }
}

/// Run the assembled command line and map its exit status.
async fn run_compiler(cmdline: String) -> Result<CompileOutcome> {
    info!(cmd = %cmdline, "invoking metadata compiler");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&cmdline);
        c
    };

    cmd.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning metadata compiler: {cmdline}"))?;

    // Consume both pipes so buffers don't fill; everything the compiler says
    // goes to the log sink.
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("compiler: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("compiler stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .context("waiting for metadata compiler")?;

    let code = status.code().unwrap_or(-1);
    debug!(exit_code = code, success = status.success(), "metadata compiler exited");

    if status.success() {
        Ok(CompileOutcome::Success)
    } else {
        Ok(CompileOutcome::Failed(code))
    }
}
