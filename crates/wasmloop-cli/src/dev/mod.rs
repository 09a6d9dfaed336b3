//! Development loop.
//!
//! - Watches the build output directory for finished artifacts
//! - Runs the optimizer over each one
//! - Pushes `reload` (or the optimizer's error) to every connected page
//!   over a hand-rolled WebSocket gateway
//! - Serves the page and its assets over HTTP

pub mod config;
pub mod gateway;
pub mod pipeline;
pub mod registry;
pub mod server;
pub mod watcher;

// Re-exports
pub use config::DevConfig;
pub use gateway::{handle_connection, Session, WebSocketGateway};
pub use pipeline::{BuildOutcome, BuildPipeline, Optimizer, WasmOpt};
pub use registry::{
    BroadcastReport, ClientConnection, ConnectionId, ConnectionRegistry, ConnectionState,
    SharedRegistry,
};
pub use server::AssetServer;
pub use watcher::{
    ArtifactEvent, ArtifactEventKind, ArtifactMatcher, ArtifactWatcher, Debouncer, EventRouter,
    WatchEvent,
};
