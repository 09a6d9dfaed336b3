//! Dev command implementation.
//!
//! Orchestrates the dev loop:
//! - WebSocket gateway for reload clients
//! - Static asset server
//! - Build directory watcher
//! - One optimize-and-broadcast task per finished artifact
//! - Graceful shutdown on Ctrl+C

use crate::cli::DevArgs;
use crate::dev::{
    ArtifactWatcher, AssetServer, BuildOutcome, BuildPipeline, ConnectionRegistry, DevConfig,
    WasmOpt, WatchEvent, WebSocketGateway,
};
use crate::error::{CliError, Result};
use crate::ui;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinSet;

/// Execute the dev command.
///
/// # Process Flow
///
/// 1. Load and validate configuration
/// 2. Bind the gateway and asset server (bind errors surface here)
/// 3. Start watching the build directory
/// 4. Main event loop:
///    - On a finished artifact, optimize it in the background
///    - Report each build outcome
///    - Stop on Ctrl+C, a fatal watch error, or a listener failure
///
/// # Errors
///
/// Returns errors for invalid configuration, unbindable ports, watcher
/// failures and servers that stop unexpectedly. Optimizer failures are
/// reported to clients and never end the loop.
pub async fn execute(args: DevArgs) -> Result<()> {
    let config = DevConfig::from_args(&args)?;

    ui::info(&format!("Working directory: {}", config.cwd.display()));

    let registry = Arc::new(ConnectionRegistry::new());

    let gateway_listener = WebSocketGateway::bind(config.ws_addr).await?;
    let gateway = WebSocketGateway::new(registry.clone());
    let mut gateway_handle = tokio::spawn(gateway.serve(gateway_listener));

    let server = AssetServer::new(config.http_addr, config.serve_root.clone(), config.ws_addr.port());
    let server_listener = server.bind().await?;
    let mut server_handle = tokio::spawn(server.serve(server_listener));

    let (watcher, mut watch_rx) = ArtifactWatcher::new(
        config.watch_dir.clone(),
        config.matcher(),
        config.config.debounce_scope,
    )?;

    let pipeline = Arc::new(BuildPipeline::new(
        Arc::new(WasmOpt::new(config.config.optimizer.clone())),
        registry.clone(),
    ));

    ui::success("wasmloop is running");
    ui::listening("Assets:", &config.server_url());
    ui::listening("Reload:", &config.gateway_url());
    ui::info(&format!(
        "Watching {} for '{}' artifacts",
        watcher.root().display(),
        config.config.artifact_marker
    ));
    ui::info("Press Ctrl+C to stop");

    let mut builds: JoinSet<(PathBuf, BuildOutcome)> = JoinSet::new();

    let result = loop {
        tokio::select! {
            event = watch_rx.recv() => match event {
                Some(WatchEvent::ArtifactReady(artifact)) => {
                    ui::info(&format!("Optimizing {}...", display_name(&artifact)));
                    let pipeline = pipeline.clone();
                    builds.spawn(async move {
                        let outcome = pipeline.run(&artifact).await;
                        (artifact, outcome)
                    });
                }
                Some(WatchEvent::Failed(message)) => {
                    break Err(CliError::Server(format!("File watcher stopped: {}", message)));
                }
                None => {
                    break Err(CliError::Server("File watcher stopped unexpectedly".to_string()));
                }
            },

            Some(joined) = builds.join_next() => match joined {
                Ok((artifact, outcome)) => report(&artifact, &outcome, registry.len()),
                Err(e) => tracing::error!(%e, "build task panicked"),
            },

            _ = signal::ctrl_c() => {
                ui::info("Shutting down...");
                break Ok(());
            }

            joined = &mut gateway_handle => {
                break Err(stopped("WebSocket gateway", joined));
            }

            joined = &mut server_handle => {
                break Err(stopped("Asset server", joined));
            }
        }
    };

    builds.abort_all();
    gateway_handle.abort();
    server_handle.abort();

    if result.is_ok() {
        ui::success("wasmloop stopped");
    }
    result
}

fn display_name(artifact: &std::path::Path) -> String {
    artifact
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| artifact.display().to_string())
}

fn report(artifact: &std::path::Path, outcome: &BuildOutcome, clients: usize) {
    match outcome {
        BuildOutcome::Success => ui::success(&format!(
            "Optimized {}, reloading {} client{}",
            display_name(artifact),
            clients,
            if clients == 1 { "" } else { "s" }
        )),
        BuildOutcome::Failure(message) => {
            ui::error(&format!("Optimizing {} failed:\n{}", display_name(artifact), message))
        }
    }
}

/// Turn a finished listener task into the error that ends the loop.
fn stopped(
    what: &str,
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> CliError {
    match joined {
        Ok(Err(e)) => e,
        Ok(Ok(())) => CliError::Server(format!("{} stopped unexpectedly", what)),
        Err(e) => CliError::Server(format!("{} task failed: {}", what, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/project/bin/app.wasm")), "app.wasm");
    }

    #[tokio::test]
    async fn test_stopped_keeps_listener_error() {
        let err = stopped("Asset server", Ok(Err(CliError::Server("boom".to_string()))));
        assert_eq!(err.to_string(), CliError::Server("boom".to_string()).to_string());

        let err = stopped("Asset server", Ok(Ok(())));
        assert!(err.to_string().contains("Asset server stopped unexpectedly"));

        let handle = tokio::spawn(async { std::future::pending::<Result<()>>().await });
        handle.abort();
        let err = stopped("WebSocket gateway", handle.await);
        assert!(err.to_string().contains("WebSocket gateway task failed"));
    }
}
