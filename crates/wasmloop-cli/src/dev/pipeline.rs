//! Optimize-and-notify pipeline.
//!
//! Runs the external optimizer over a freshly linked artifact, then tells
//! every connected client either to reload or what went wrong.

use crate::config::OptimizerConfig;
use crate::dev::registry::SharedRegistry;
use crate::error::BuildError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;

/// Sent to clients after a successful optimization.
pub const RELOAD_MESSAGE: &str = "reload";

/// Sent when the optimizer failed but printed nothing.
pub const FALLBACK_FAILURE_MESSAGE: &str = "optimizer failed without diagnostic output";

/// Result of one optimize run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failure(String),
}

impl BuildOutcome {
    /// Text broadcast to clients for this outcome.
    pub fn message(&self) -> &str {
        match self {
            BuildOutcome::Success => RELOAD_MESSAGE,
            BuildOutcome::Failure(message) => message.as_str(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

impl From<BuildError> for BuildOutcome {
    fn from(err: BuildError) -> Self {
        let message = match err {
            BuildError::ExitFailure { message, .. } if !message.trim().is_empty() => {
                message.trim().to_string()
            }
            BuildError::ExitFailure { .. } => FALLBACK_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        };
        BuildOutcome::Failure(message)
    }
}

/// An artifact post-processor.
///
/// Returns captured stdout on success.
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn optimize(&self, artifact: &Path) -> Result<String, BuildError>;
}

/// Binaryen `wasm-opt` invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct WasmOpt {
    config: OptimizerConfig,
}

impl WasmOpt {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Argument vector for one in-place run over `artifact`.
    pub fn args(&self, artifact: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            artifact.as_os_str().to_owned(),
            self.config.opt_level.clone().into(),
        ];

        if self.config.asyncify {
            args.push("--asyncify".into());
            args.push(
                format!(
                    "--pass-arg=asyncify-imports@{}",
                    self.config.asyncify_imports.join(",")
                )
                .into(),
            );
        }

        args.extend(self.config.extra_args.iter().map(OsString::from));
        args.push("-o".into());
        args.push(artifact.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl Optimizer for WasmOpt {
    async fn optimize(&self, artifact: &Path) -> Result<String, BuildError> {
        let program = &self.config.path;
        let args = self.args(artifact);
        tracing::debug!(program = %program.display(), ?args, "running optimizer");

        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BuildError::SpawnFailed {
                program: program.clone(),
                source,
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(BuildError::WaitFailed)?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() { stdout } else { stderr };
            return Err(BuildError::ExitFailure {
                exit_code: output.status.code(),
                message,
            });
        }

        Ok(stdout)
    }
}

/// Optimizes ready artifacts and broadcasts the outcome.
pub struct BuildPipeline {
    optimizer: Arc<dyn Optimizer>,
    registry: SharedRegistry,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl BuildPipeline {
    pub fn new(optimizer: Arc<dyn Optimizer>, registry: SharedRegistry) -> Self {
        Self {
            optimizer,
            registry,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, artifact: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(artifact.to_path_buf())
            .or_default()
            .clone()
    }

    /// Drop the entry for `artifact` once no run holds or waits on it.
    fn release(&self, artifact: &Path) {
        let mut locks = self.locks.lock();
        if locks
            .get(artifact)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(artifact);
        }
    }

    /// Optimize `artifact` and broadcast the outcome.
    ///
    /// Runs for the same path never overlap.
    pub async fn run(&self, artifact: &Path) -> BuildOutcome {
        let outcome = {
            let lock = self.lock_for(artifact);
            let _guard = lock.lock().await;
            let outcome = self.optimize_artifact(artifact).await;
            self.publish(&outcome);
            outcome
        };
        self.release(artifact);
        outcome
    }

    async fn optimize_artifact(&self, artifact: &Path) -> BuildOutcome {
        tracing::info!(artifact = %artifact.display(), "optimizing");
        let start = Instant::now();

        match self.optimizer.optimize(artifact).await {
            Ok(stdout) => {
                if !stdout.is_empty() {
                    tracing::info!(target: "wasmloop_cli::optimizer", "{}", stdout);
                }
                tracing::info!(
                    artifact = %artifact.display(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "optimizer finished"
                );
                BuildOutcome::Success
            }
            Err(err) => {
                tracing::error!(artifact = %artifact.display(), %err, "optimizer failed");
                BuildOutcome::from(err)
            }
        }
    }

    /// Broadcast an outcome to every connected client.
    pub fn publish(&self, outcome: &BuildOutcome) {
        let report = self.registry.broadcast_text(outcome.message());
        tracing::debug!(
            delivered = report.delivered,
            skipped = report.skipped,
            removed = report.removed,
            "broadcast build outcome"
        );
    }
}
