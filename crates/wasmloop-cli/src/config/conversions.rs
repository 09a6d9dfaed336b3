// Conversions from CLI enums to config types

use crate::cli;
use crate::config::types;

impl From<cli::DebounceScope> for types::DebounceScope {
    fn from(scope: cli::DebounceScope) -> Self {
        match scope {
            cli::DebounceScope::PerFile => types::DebounceScope::PerFile,
            cli::DebounceScope::Global => types::DebounceScope::Global,
        }
    }
}
