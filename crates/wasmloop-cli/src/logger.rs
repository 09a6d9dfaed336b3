//! Logging setup for wasmloop.
//!
//! Built on `tracing`. Filter precedence:
//! 1. `--verbose`: debug for wasmloop, warn for dependencies
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. Default: info for wasmloop, warn for dependencies
//!
//! # Example
//!
//! ```rust,no_run
//! use wasmloop_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("watching build directory");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_DIRECTIVES: &str = "warn,wasmloop=debug,wasmloop_cli=debug";
const QUIET_DIRECTIVES: &str = "error";
const DEFAULT_DIRECTIVES: &str = "warn,wasmloop=info,wasmloop_cli=info";

/// Filter directives for the given verbosity flags.
///
/// `None` means `RUST_LOG` (or the default) decides.
pub fn directives(verbose: bool, quiet: bool) -> Option<&'static str> {
    if verbose {
        Some(VERBOSE_DIRECTIVES)
    } else if quiet {
        Some(QUIET_DIRECTIVES)
    } else {
        None
    }
}

fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    match directives(verbose, quiet) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    }
}

/// Initialize the global tracing subscriber. Call once, before any logging.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging (overrides `quiet`)
/// * `quiet` - Only show error-level logs
/// * `no_color` - Disable ANSI colors
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(build_filter(verbose, quiet), no_color);
}

/// Initialize with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
