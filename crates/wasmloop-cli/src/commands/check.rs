//! Check command implementation.
//!
//! Loads the layered configuration, validates it and prints the result.

use crate::cli::CheckArgs;
use crate::config::{ConfigOverrides, WasmloopConfig};
use crate::error::{Result, ResultExt};
use crate::ui;
use std::path::Path;

/// Execute the check command.
///
/// With `--schema` or `--example` prints that document and returns.
/// Otherwise loads config from every source, validates it, reports
/// non-fatal problems and prints the resolved config as JSON on stdout.
///
/// # Errors
///
/// Returns errors for unreadable or invalid configuration.
pub async fn execute(args: CheckArgs) -> Result<()> {
    if args.schema {
        println!(
            "{}",
            serde_json::to_string_pretty(&WasmloopConfig::json_schema())?
        );
        return Ok(());
    }

    if args.example {
        println!("{}", WasmloopConfig::example_config());
        return Ok(());
    }

    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to read working directory")?,
    };

    ui::info("Checking configuration...");
    let config =
        WasmloopConfig::load(&ConfigOverrides::default(), args.config.as_deref(), &cwd)?;
    config.validate()?;
    ui::success("Configuration is valid");

    for warning in warnings(&config, &cwd) {
        ui::warning(&warning);
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Problems that don't invalidate the config but will stop `wasmloop dev`.
fn warnings(config: &WasmloopConfig, cwd: &Path) -> Vec<String> {
    let mut warnings = Vec::new();

    let watch_dir = cwd.join(&config.watch_dir);
    if !watch_dir.is_dir() {
        warnings.push(format!(
            "watch_dir does not exist yet: {}",
            watch_dir.display()
        ));
    }

    let serve_root = cwd.join(&config.serve_root);
    if !serve_root.is_dir() {
        warnings.push(format!("serve_root does not exist: {}", serve_root.display()));
    }

    if !config.optimizer.asyncify && !config.optimizer.asyncify_imports.is_empty() {
        warnings.push("optimizer.asyncify_imports is ignored while asyncify is off".to_string());
    }

    warnings
}
