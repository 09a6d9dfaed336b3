use crate::config::{DebounceScope, WasmloopConfig};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use serde::Serialize;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides (`WASMLOOP_HTTP_PORT`, `WASMLOOP_OPTIMIZER__PATH`, ...).
pub const ENV_PREFIX: &str = "WASMLOOP_";

/// Config files probed in the working directory, in order.
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["wasmloop.toml", "wasmloop.json"];

/// Values given on the command line. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serve_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_scope: Option<DebounceScope>,
    #[serde(skip_serializing_if = "OptimizerOverrides::is_empty")]
    pub optimizer: OptimizerOverrides,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OptimizerOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opt_level: Option<String>,
}

impl OptimizerOverrides {
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.opt_level.is_none()
    }
}

impl WasmloopConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    ///
    /// `config_path` is resolved against `cwd`; when absent, the files in
    /// [`DEFAULT_CONFIG_FILES`] are probed instead.
    pub fn load(
        overrides: &ConfigOverrides,
        config_path: Option<&Path>,
        cwd: &Path,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = Self::locate_config_file(config_path, cwd)? {
            tracing::debug!("Loading config file {}", path.display());
            figment = if is_json(&path) {
                figment.merge(Json::file(path))
            } else {
                figment.merge(Toml::file(path))
            };
        }

        // Nested keys use a double underscore: WASMLOOP_OPTIMIZER__OPT_LEVEL
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment = figment.merge(Serialized::defaults(overrides));

        figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()).into())
    }

    fn locate_config_file(config_path: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
        match config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    cwd.join(path)
                };
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Ok(Some(path))
            }
            None => Ok(DEFAULT_CONFIG_FILES
                .iter()
                .map(|name| cwd.join(name))
                .find(|candidate| candidate.is_file())),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("json")
}
