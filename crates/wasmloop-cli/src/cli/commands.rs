use clap::{Args, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cli::enums::DebounceScope;
use crate::cli::validation::parse_opt_level;
use crate::config::{ConfigOverrides, OptimizerOverrides};

/// Available wasmloop subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the watch / optimize / reload loop
    ///
    /// Serves the page over HTTP, accepts reload clients on the WebSocket
    /// port, and runs the optimizer whenever the build finishes writing a
    /// new artifact.
    Dev(DevArgs),

    /// Validate configuration
    ///
    /// Loads wasmloop.toml / wasmloop.json, environment overrides and flags,
    /// validates the result and prints it.
    Check(CheckArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug)]
pub struct DevArgs {
    /// Directory the build writes raw objects into
    #[arg(value_name = "WATCH_DIR")]
    pub watch_dir: Option<PathBuf>,

    /// Path to a config file (defaults to wasmloop.toml or wasmloop.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root directory for static files
    #[arg(long, value_name = "DIR")]
    pub serve_root: Option<PathBuf>,

    /// Interface to bind both listeners to
    #[arg(long, value_name = "ADDR")]
    pub host: Option<IpAddr>,

    /// Port for static file serving
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Port for the WebSocket reload gateway
    #[arg(long, value_name = "PORT")]
    pub ws_port: Option<u16>,

    /// Optimizer executable
    #[arg(long, value_name = "PATH")]
    pub optimizer: Option<PathBuf>,

    /// Optimization level flag passed to the optimizer (e.g. -O, -Oz, -g)
    #[arg(long, value_parser = parse_opt_level, value_name = "FLAG", allow_hyphen_values = true)]
    pub opt_level: Option<String>,

    /// Debounce keying for artifact events
    #[arg(long, value_enum, value_name = "SCOPE")]
    pub debounce_scope: Option<DebounceScope>,

    /// Working directory (relative paths resolve against it)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

impl DevArgs {
    /// Flags that override file and environment configuration.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            watch_dir: self.watch_dir.clone(),
            serve_root: self.serve_root.clone(),
            host: self.host,
            http_port: self.port,
            ws_port: self.ws_port,
            debounce_scope: self.debounce_scope.map(Into::into),
            optimizer: OptimizerOverrides {
                path: self.optimizer.clone(),
                opt_level: self.opt_level.clone(),
            },
        }
    }
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to a config file (defaults to wasmloop.toml or wasmloop.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the JSON schema of the configuration instead
    #[arg(long, conflicts_with = "example")]
    pub schema: bool,

    /// Print an example configuration instead
    #[arg(long)]
    pub example: bool,

    /// Working directory (relative paths resolve against it)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}
