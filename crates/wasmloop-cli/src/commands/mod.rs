//! Command implementations for the wasmloop CLI.
//!
//! - [`dev`] - Watch, optimize and live-reload
//! - [`check`] - Configuration validation
//!
//! Each command provides an `execute` function that takes the parsed
//! arguments and returns a Result.

pub mod check;
pub mod dev;

pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
