//! Status message functions for terminal output.

use super::colors_enabled;
use owo_colors::OwoColorize;

/// Print a success message to stderr.
pub fn success(message: &str) {
    if colors_enabled() {
        eprintln!("{} {}", "✓".green().bold(), message);
    } else {
        eprintln!("✓ {}", message);
    }
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    if colors_enabled() {
        eprintln!("{} {}", "ℹ".blue().bold(), message);
    } else {
        eprintln!("ℹ {}", message);
    }
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    if colors_enabled() {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    } else {
        eprintln!("⚠ {}", message);
    }
}

/// Print an error message to stderr.
///
/// Multi-line optimizer output is printed as-is after the marker.
pub fn error(message: &str) {
    if colors_enabled() {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    } else {
        eprintln!("✗ {}", message);
    }
}

/// Print a labelled address, e.g. `  → Assets:  http://127.0.0.1:8000`.
pub fn listening(label: &str, url: &str) {
    if colors_enabled() {
        eprintln!("  {} {:<8} {}", "→".cyan(), label.bold(), url.cyan().underline());
    } else {
        eprintln!("  → {:<8} {}", label, url);
    }
}
