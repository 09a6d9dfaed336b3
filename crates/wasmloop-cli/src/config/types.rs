use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How debounce state is keyed across watched files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DebounceScope {
    /// Each artifact file tracks its own last event kind
    #[default]
    PerFile,
    /// One last-event-kind shared by every matching file
    Global,
}

/// External optimizer invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Optimizer executable (looked up on PATH when relative)
    #[serde(default = "crate::config::defaults::default_optimizer_path")]
    pub path: PathBuf,

    /// Optimization level flag, e.g. "-g" for debug builds or "-O" for release
    #[serde(default = "crate::config::defaults::default_opt_level")]
    pub opt_level: String,

    /// Run the asyncify transform
    #[serde(default = "crate::config::defaults::default_asyncify")]
    pub asyncify: bool,

    /// Imports that may unwind/rewind the stack under asyncify
    #[serde(default = "crate::config::defaults::default_asyncify_imports")]
    pub asyncify_imports: Vec<String>,

    /// Extra arguments inserted before the output flag
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            path: crate::config::defaults::default_optimizer_path(),
            opt_level: crate::config::defaults::default_opt_level(),
            asyncify: crate::config::defaults::default_asyncify(),
            asyncify_imports: crate::config::defaults::default_asyncify_imports(),
            extra_args: vec![],
        }
    }
}
