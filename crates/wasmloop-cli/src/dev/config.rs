//! Dev loop configuration.
//!
//! Resolves a loaded [`WasmloopConfig`] against the working directory into
//! concrete paths and socket addresses.

use crate::cli::DevArgs;
use crate::config::WasmloopConfig;
use crate::dev::watcher::ArtifactMatcher;
use crate::error::{CliError, Result, ResultExt};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Fully resolved settings for one `wasmloop dev` session.
#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Validated base configuration
    pub config: WasmloopConfig,

    /// Working directory paths are resolved against
    pub cwd: PathBuf,

    /// Absolute build output directory
    pub watch_dir: PathBuf,

    /// Absolute static asset root
    pub serve_root: PathBuf,

    /// Asset server address
    pub http_addr: SocketAddr,

    /// WebSocket gateway address
    pub ws_addr: SocketAddr,
}

impl DevConfig {
    /// Create DevConfig from CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns error if configuration fails to load or validate, or a
    /// configured directory is missing.
    pub fn from_args(args: &DevArgs) -> Result<Self> {
        let cwd = match &args.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().context("Failed to read working directory")?,
        };

        let config = WasmloopConfig::load(&args.overrides(), args.config.as_deref(), &cwd)?;
        Self::from_config(config, cwd)
    }

    /// Resolve an already loaded configuration.
    pub fn from_config(config: WasmloopConfig, cwd: PathBuf) -> Result<Self> {
        config.validate()?;

        let dev = Self {
            watch_dir: resolve(&cwd, &config.watch_dir),
            serve_root: resolve(&cwd, &config.serve_root),
            http_addr: SocketAddr::new(config.host, config.http_port),
            ws_addr: SocketAddr::new(config.host, config.ws_port),
            config,
            cwd,
        };

        dev.validate()?;
        Ok(dev)
    }

    /// Check the resolved directories exist.
    pub fn validate(&self) -> Result<()> {
        if !self.cwd.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "Working directory does not exist: {}",
                self.cwd.display()
            )));
        }

        require_dir(&self.watch_dir, "watch_dir")?;
        require_dir(&self.serve_root, "serve_root")
    }

    /// Matcher for raw artifacts in the watch directory.
    pub fn matcher(&self) -> ArtifactMatcher {
        ArtifactMatcher::new(&self.config.artifact_marker, &self.config.object_suffix)
    }

    /// URL of the asset server.
    pub fn server_url(&self) -> String {
        format!("http://{}", self.http_addr)
    }

    /// URL of the reload gateway.
    pub fn gateway_url(&self) -> String {
        format!("ws://{}", self.ws_addr)
    }
}

/// A missing directory is `FileNotFound`; a file in its place is rejected.
fn require_dir(path: &Path, field: &str) -> Result<()> {
    let metadata = std::fs::metadata(path).with_path(path)?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!(
            "{} is not a directory: {}",
            field,
            path.display()
        )))
    }
}

fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
