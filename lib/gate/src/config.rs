//! Gate configuration.
//!
//! Loaded via the `config` crate from `AUTHGATE__*` environment variables,
//! optionally layered over a configuration file.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::policy::ValidationPolicy;

/// Key the latest-provider hint is stored under by default.
pub const DEFAULT_HINT_KEY: &str = "AUTHGATE_LATEST_PROVIDER_ID";

/// Configuration for an `AuthGate`.
///
/// Fields with defaults can be omitted when loading from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Which linked identities to re-validate at startup.
    #[serde(default)]
    pub validation: ValidationPolicy,

    /// Upper bound on any single provider or identity store call, in seconds.
    /// Zero is read as one second.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Hint store key for the latest-provider hint.
    #[serde(default = "default_hint_key")]
    pub hint_key: String,
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_hint_key() -> String {
    DEFAULT_HINT_KEY.to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            validation: ValidationPolicy::default(),
            call_timeout_secs: default_call_timeout_secs(),
            hint_key: default_hint_key(),
        }
    }
}

impl GateConfig {
    /// Sets the validation policy.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationPolicy) -> Self {
        self.validation = validation;
        self
    }

    /// Returns the external call timeout, never less than one second.
    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs.max(1))
    }
}

/// Loads `T` from an optional file, overridden by `AUTHGATE__*` environment
/// variables.
///
/// # Errors
///
/// Returns an error if the file is malformed or a value is invalid.
pub fn load_layered<T: DeserializeOwned>(file: Option<&Path>) -> Result<T, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(false));
    }
    builder
        .add_source(
            config::Environment::with_prefix("AUTHGATE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = GateConfig::default();
        assert_eq!(config.validation, ValidationPolicy::ValidateLatest);
        assert_eq!(config.call_timeout(), Duration::from_secs(60));
        assert_eq!(config.hint_key, DEFAULT_HINT_KEY);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: GateConfig =
            serde_json::from_str(r#"{"validation":"all"}"#).expect("deserialize");
        assert_eq!(config.validation, ValidationPolicy::ValidateAll);
        assert_eq!(config.call_timeout_secs, 60);
    }

    #[test]
    fn zero_call_timeout_is_read_as_one_second() {
        let config: GateConfig =
            serde_json::from_str(r#"{"call_timeout_secs":0}"#).expect("deserialize");
        assert_eq!(config.call_timeout_secs, 0);
        assert_eq!(config.call_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn load_layered_reads_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(file, "validation = \"all\"\ncall_timeout_secs = 0").expect("write");

        let config: GateConfig = load_layered(Some(file.path())).expect("load");
        assert_eq!(config.validation, ValidationPolicy::ValidateAll);
        assert_eq!(config.call_timeout(), Duration::from_secs(1));
        assert_eq!(config.hint_key, DEFAULT_HINT_KEY);
    }
}
