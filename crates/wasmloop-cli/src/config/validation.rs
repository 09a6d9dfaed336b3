use crate::config::WasmloopConfig;
use crate::error::{ConfigError, Result};

/// Validate an optimization level flag such as `-O`, `-O3`, `-Oz` or `-g`.
pub fn validate_opt_level(flag: &str) -> Result<()> {
    if !flag.starts_with('-') || flag.len() < 2 {
        return Err(ConfigError::InvalidValue {
            field: "optimizer.opt_level".to_string(),
            value: flag.to_string(),
            hint: "Use a wasm-opt flag such as -O, -O3, -Os, -Oz or -g".to_string(),
        }
        .into());
    }

    if flag.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            field: "optimizer.opt_level".to_string(),
            value: flag.to_string(),
            hint: "Pass a single flag; put additional flags in optimizer.extra_args".to_string(),
        }
        .into());
    }

    Ok(())
}

impl WasmloopConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.artifact_marker.is_empty() {
            return Err(ConfigError::MissingField {
                field: "artifact_marker".to_string(),
                hint: "Set the substring that identifies the raw build object, e.g. \".wasm.o\""
                    .to_string(),
            }
            .into());
        }

        if self.object_suffix.is_empty() || !self.artifact_marker.ends_with(&self.object_suffix) {
            return Err(ConfigError::InvalidValue {
                field: "object_suffix".to_string(),
                value: self.object_suffix.clone(),
                hint: format!(
                    "The suffix must be a non-empty tail of artifact_marker ('{}')",
                    self.artifact_marker
                ),
            }
            .into());
        }

        for (field, port) in [("http_port", self.http_port), ("ws_port", self.ws_port)] {
            if port == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: port.to_string(),
                    hint: "Ports are fixed configuration; choose a concrete port".to_string(),
                }
                .into());
            }
        }

        if self.http_port == self.ws_port {
            return Err(ConfigError::InvalidValue {
                field: "ws_port".to_string(),
                value: self.ws_port.to_string(),
                hint: "The WebSocket gateway needs its own port, distinct from http_port"
                    .to_string(),
            }
            .into());
        }

        if self.optimizer.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField {
                field: "optimizer.path".to_string(),
                hint: "Point this at the wasm-opt executable".to_string(),
            }
            .into());
        }

        validate_opt_level(&self.optimizer.opt_level)?;

        if self.optimizer.asyncify && self.optimizer.asyncify_imports.is_empty() {
            return Err(ConfigError::MissingField {
                field: "optimizer.asyncify_imports".to_string(),
                hint: "List the imports that may suspend, e.g. [\"env.frame\"], or disable asyncify"
                    .to_string(),
            }
            .into());
        }

        if let Some(bad) = self
            .optimizer
            .asyncify_imports
            .iter()
            .find(|import| !import.contains('.') || import.contains(','))
        {
            return Err(ConfigError::InvalidValue {
                field: "optimizer.asyncify_imports".to_string(),
                value: bad.clone(),
                hint: "Each entry is a single module.function name".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
