//! Error handling for the wasmloop CLI.
//!
//! This module provides a hierarchical error type system using `thiserror`.
//! Each variant is meant to be actionable: configuration problems carry a
//! hint, optimizer failures carry the diagnostic text the tool printed.
//!
//! # Architecture
//!
//! - **Top-level errors** (`CliError`) represent broad categories of failures
//! - **Domain-specific errors** (`ConfigError`, `BuildError`) provide detailed
//!   context
//! - `HandshakeError` is returned by the upgrade parser and only drops the
//!   offending connection
//! - **Error conversion** is automatic via `#[from]` attributes
//! - **Context helpers** allow attaching additional information to errors
//!
//! # Example
//!
//! ```rust,no_run
//! use wasmloop_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_page(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .context("Failed to read page from serve_root")
//! }
//! ```

mod miette;

pub use self::miette::cli_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (invalid values, unreadable file, etc.)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Optimizer failures
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system or socket operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP or WebSocket listener errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors prefixed with what was being attempted
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Explicitly requested config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Check the path, or drop --config to use wasmloop.toml / wasmloop.json", .0.display())]
    NotFound(PathBuf),

    /// Config sources could not be merged or deserialized
    #[error("Invalid configuration: {0}\n\nHint: Check the config file syntax and WASMLOOP_* environment variables")]
    Invalid(String),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Optimizer errors.
///
/// None of these are fatal to the dev loop: the pipeline turns them into a
/// failure message that is pushed to every connected client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The optimizer binary could not be started
    #[error("Failed to launch optimizer '{}': {source}", .program.display())]
    SpawnFailed {
        /// Program that was executed
        program: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the optimizer process failed
    #[error("Failed to wait for optimizer: {0}")]
    WaitFailed(#[source] std::io::Error),

    /// The optimizer ran and exited unsuccessfully
    #[error("Optimizer exited with {}: {message}", exit_code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    ExitFailure {
        /// Exit code, `None` when terminated by a signal
        exit_code: Option<i32>,
        /// Diagnostic text captured from the process
        message: String,
    },
}

/// Reasons an inbound request is not promoted to a WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Request is not valid UTF-8 text
    #[error("request is not valid UTF-8")]
    NotText,

    /// Request lacks the `Upgrade: websocket` token
    #[error("request is not a WebSocket upgrade")]
    NotUpgrade,

    /// Upgrade request has no usable `Sec-WebSocket-Key` header
    #[error("missing or empty Sec-WebSocket-Key header")]
    MissingKey,
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Add a file path to the error context.
    ///
    /// Turns `NotFound` I/O errors into [`CliError::FileNotFound`].
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Prefix the error with a custom message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            match err {
                CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                    CliError::FileNotFound(path.as_ref().to_path_buf())
                }
                other => other,
            }
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
