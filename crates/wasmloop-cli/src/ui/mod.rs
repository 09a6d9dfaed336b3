//! Terminal status output.
//!
//! Short, human-facing lines on stderr; detailed diagnostics go through
//! `tracing` instead.
//!
//! ```no_run
//! use wasmloop_cli::ui;
//!
//! ui::init_colors(true);
//! ui::success("Optimized bin/app.wasm");
//! ui::error("out of memory");
//! ```

mod messages;

pub use messages::{error, info, listening, success, warning};

use std::sync::atomic::{AtomicBool, Ordering};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Check if color output should be enabled.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise stderr must be a terminal.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr() && console::Term::stderr().features().colors_supported()
}

/// Turn colored status output on or off. Call early in `main`.
pub fn init_colors(enabled: bool) {
    COLORS.store(enabled, Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
