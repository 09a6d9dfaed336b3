//! Miette diagnostic conversion for CLI errors.

use crate::error::{BuildError, CliError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::Watch(e) => miette::miette!(
            "File watcher error: {}\n\nHint: The watched directory must exist for the whole session",
            e
        ),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::SpawnFailed { program, source } => miette::miette!(
            "Failed to launch optimizer '{}': {}\n\nHint: Install binaryen or set optimizer.path in wasmloop.toml",
            program.display(),
            source
        ),
        _ => miette::miette!("{}", err),
    }
}
