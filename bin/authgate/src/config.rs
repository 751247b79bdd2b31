//! CLI configuration.
//!
//! Layers an optional file under `AUTHGATE__*` environment variables. Gate
//! settings sit at the top level, so `AUTHGATE__VALIDATION=all` sets the
//! validation policy.

use authgate::{
    GateConfig, ProviderRegistry, RegistryError, SignInBehavior, ValidateBehavior,
    VirtualProvider, load_layered,
};
use authgate_core::ProviderId;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything the CLI needs to build a gate.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub gate: GateConfig,

    /// Where identity store and hint state persist between runs.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Virtual providers to register.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

/// One virtual provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub id: ProviderId,

    /// Reported platform support.
    #[serde(default = "default_supported")]
    pub supported: bool,

    /// Sign-in outcome; a fixed successful subject when omitted.
    #[serde(default)]
    pub sign_in: Option<SignInBehavior>,

    /// Validation outcome; always valid when omitted.
    #[serde(default)]
    pub validate: Option<ValidateBehavior>,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("authgate-state.json")
}

fn default_supported() -> bool {
    true
}

fn default_providers() -> Vec<ProviderConfig> {
    [ProviderId::google(), ProviderId::apple()]
        .into_iter()
        .map(|id| ProviderConfig {
            sign_in: Some(SignInBehavior::Succeed {
                subject: format!("{id}-user"),
                email: None,
            }),
            id,
            supported: true,
            validate: None,
        })
        .collect()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            state_path: default_state_path(),
            providers: default_providers(),
        }
    }
}

impl ProviderConfig {
    fn build(&self) -> VirtualProvider {
        let mut provider =
            VirtualProvider::new(self.id.clone()).with_supported(self.supported);
        if let Some(sign_in) = &self.sign_in {
            provider = provider.with_sign_in(sign_in.clone());
        }
        if let Some(validate) = &self.validate {
            provider = provider.with_validate(validate.clone());
        }
        provider
    }
}

impl CliConfig {
    /// Loads configuration from an optional file, overridden by the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        load_layered(file)
    }

    /// Builds the provider registry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateProvider` if two entries share an id.
    pub fn registry(&self) -> Result<ProviderRegistry, Report<RegistryError>> {
        let mut registry = ProviderRegistry::new();
        for provider in &self.providers {
            registry.register(Arc::new(provider.build()))?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate::ValidationPolicy;
    use std::io::Write;

    #[test]
    fn defaults_register_google_and_apple() {
        let config = CliConfig::default();
        let registry = config.registry().expect("registry");

        assert_eq!(config.state_path, PathBuf::from("authgate-state.json"));
        assert_eq!(
            registry.available(),
            vec![ProviderId::apple(), ProviderId::google()]
        );
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        write!(
            file,
            r#"{{
                "validation": "all",
                "call_timeout_secs": 5,
                "state_path": "/var/lib/authgate/state.json",
                "providers": [
                    {{ "id": "google.com", "validate": "invalid" }},
                    {{ "id": "apple.com", "supported": false, "sign_in": {{ "outcome": "cancel" }} }}
                ]
            }}"#
        )
        .expect("write");

        let config = CliConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.gate.validation, ValidationPolicy::ValidateAll);
        assert_eq!(config.gate.call_timeout_secs, 5);
        assert_eq!(config.state_path, PathBuf::from("/var/lib/authgate/state.json"));
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].validate, Some(ValidateBehavior::Invalid));
        assert_eq!(config.providers[1].sign_in, Some(SignInBehavior::Cancel));

        let registry = config.registry().expect("registry");
        assert_eq!(registry.available(), vec![ProviderId::google()]);
        assert!(registry.supports(&ProviderId::apple()));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = CliConfig::load(Some(&dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config.providers, default_providers());
    }

    #[test]
    fn duplicate_providers_are_rejected() {
        let entry = ProviderConfig {
            id: ProviderId::google(),
            supported: true,
            sign_in: None,
            validate: None,
        };
        let config = CliConfig {
            providers: vec![entry.clone(), entry],
            ..CliConfig::default()
        };

        let err = config.registry().unwrap_err();
        assert_eq!(
            err.current_context(),
            &RegistryError::DuplicateProvider {
                provider_id: ProviderId::google()
            }
        );
    }
}
