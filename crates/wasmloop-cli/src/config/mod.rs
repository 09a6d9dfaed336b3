//! Configuration system for wasmloop with multi-source loading.
//!
//! Merges settings from CLI args, environment variables, and config files.
//! Priority: CLI > Environment > File > Defaults

mod conversions;
mod defaults;
mod loading;
mod types;
mod validation;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

pub use defaults::*;
pub use loading::{ConfigOverrides, OptimizerOverrides, DEFAULT_CONFIG_FILES, ENV_PREFIX};
pub use types::*;
pub use validation::validate_opt_level;

/// wasmloop configuration - loaded from wasmloop.toml / wasmloop.json or CLI args.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WasmloopConfig {
    /// Directory the build writes its raw objects into (watched non-recursively)
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Substring identifying the raw, pre-optimization artifact (e.g. ".wasm.o")
    #[serde(default = "default_artifact_marker")]
    pub artifact_marker: String,

    /// Intermediate-object suffix stripped to obtain the final artifact name
    #[serde(default = "default_object_suffix")]
    pub object_suffix: String,

    /// Debounce keying (per-file or global)
    #[serde(default)]
    pub debounce_scope: DebounceScope,

    /// Root directory for static asset delivery
    #[serde(default = "default_serve_root")]
    pub serve_root: PathBuf,

    /// Interface both listeners bind to
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Static asset server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// WebSocket reload gateway port
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,

    /// External optimizer settings
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl Default for WasmloopConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            artifact_marker: default_artifact_marker(),
            object_suffix: default_object_suffix(),
            debounce_scope: DebounceScope::default(),
            serve_root: default_serve_root(),
            host: default_host(),
            http_port: default_http_port(),
            ws_port: default_ws_port(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl WasmloopConfig {
    /// Generate JSON Schema for the config file.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(WasmloopConfig);
        serde_json::to_value(schema).expect("Schema serialization should never fail")
    }

    /// Generate example wasmloop.json content.
    pub fn example_config() -> String {
        serde_json::to_string_pretty(&Self {
            optimizer: OptimizerConfig {
                opt_level: "-O".to_string(),
                extra_args: vec!["--strip-debug".to_string()],
                ..OptimizerConfig::default()
            },
            ..Self::default()
        })
        .expect("Example config serialization should never fail")
    }
}
