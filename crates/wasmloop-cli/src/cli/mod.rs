//! Command-line interface definition for wasmloop.
//!
//! This module defines the CLI structure using clap v4's derive macros.
//!
//! # Command Structure
//!
//! - `wasmloop dev` - Watch, optimize and live-reload
//! - `wasmloop check` - Validate and print the resolved configuration

mod commands;
pub mod enums;
mod validation;

use clap::Parser;

pub use commands::{CheckArgs, Command, DevArgs};
pub use enums::*;
pub use validation::parse_opt_level;

/// wasmloop - live-reload loop for WebAssembly builds
#[derive(Parser, Debug)]
#[command(
    name = "wasmloop",
    version,
    about = "Watch, optimize and live-reload WebAssembly builds",
    long_about = "wasmloop watches your build output directory, runs wasm-opt on every\n\
                  freshly linked module, and tells connected browser tabs to reload\n\
                  (or shows them the optimizer's error) over a WebSocket."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
