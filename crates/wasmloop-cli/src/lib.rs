//! wasmloop - live-reload loop for WebAssembly builds.
//!
//! Watches a build output directory, runs `wasm-opt` over every freshly linked
//! module and tells connected browser tabs to reload, or shows them the
//! optimizer's error, over a small hand-written WebSocket server.
//!
//! # Architecture
//!
//! - [`ws`] - RFC 6455 handshake and server frame encoding
//! - [`dev`] - Watcher, optimize pipeline, connection registry, gateway and
//!   asset server
//! - [`config`] - Layered configuration (defaults, file, env, CLI)
//! - [`error`] - Error types with actionable messages
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status output
//! - `cli` / `commands` - Argument parsing and command implementations
//!
//! # Example
//!
//! ```rust
//! use wasmloop_cli::ws::{derive_accept_key, encode_frame};
//!
//! assert_eq!(
//!     derive_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
//!     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
//! );
//! assert_eq!(&encode_frame(b"reload", false)[..2], &[0x81u8, 6]);
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;
pub mod ws;

// Re-export commonly used types
pub use error::{BuildError, CliError, ConfigError, HandshakeError, Result, ResultExt};
