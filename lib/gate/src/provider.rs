//! Credential provider trait and the registry the gate looks them up in.
//!
//! All sign-in methods implement `CredentialProvider`, giving the gate a
//! uniform interface regardless of the platform SDK behind each one.

use async_trait::async_trait;
use authgate_core::ProviderId;
use rootcause::prelude::Report;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ProviderError, RegistryError};
use crate::identity::{Credential, LinkedIdentity};

/// An external authentication method.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the stable key for this provider.
    fn id(&self) -> ProviderId;

    /// Returns true if the current platform can run this provider's flow.
    fn is_supported(&self) -> bool;

    /// Runs the platform sign-in flow and returns a credential.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Canceled` if the user backed out, or
    /// `ProviderError::Failed` for any other failure.
    async fn sign_in(&self) -> Result<Credential, ProviderError>;

    /// Checks whether a previously linked identity is still authorized.
    ///
    /// Returns `Ok(false)` when the platform no longer authorizes the
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures; the gate treats those as
    /// a failed validation.
    async fn validate(&self, identity: &LinkedIdentity) -> Result<bool, ProviderError>;
}

/// Providers keyed by their own id.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn CredentialProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under the id it reports.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateProvider` if the id is already taken.
    pub fn register(
        &mut self,
        provider: Arc<dyn CredentialProvider>,
    ) -> Result<(), Report<RegistryError>> {
        let provider_id = provider.id();
        if self.providers.contains_key(&provider_id) {
            return Err(RegistryError::DuplicateProvider { provider_id }.into());
        }
        self.providers.insert(provider_id, provider);
        Ok(())
    }

    /// Builder-style `register`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateProvider` if the id is already taken.
    pub fn with(
        mut self,
        provider: Arc<dyn CredentialProvider>,
    ) -> Result<Self, Report<RegistryError>> {
        self.register(provider)?;
        Ok(self)
    }

    /// Looks up a provider.
    #[must_use]
    pub fn lookup(&self, provider_id: &ProviderId) -> Option<Arc<dyn CredentialProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Returns true if a provider is registered under this id.
    #[must_use]
    pub fn supports(&self, provider_id: &ProviderId) -> bool {
        self.providers.contains_key(provider_id)
    }

    /// Registered ids whose provider can run on this platform, sorted.
    #[must_use]
    pub fn available(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self
            .providers
            .iter()
            .filter(|(_, p)| p.is_supported())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.providers.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::virtual_provider::VirtualProvider;

    #[test]
    fn register_and_lookup() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(VirtualProvider::new(ProviderId::google())))
            .expect("register");

        assert!(registry.supports(&ProviderId::google()));
        assert!(!registry.supports(&ProviderId::apple()));
        assert!(registry.lookup(&ProviderId::google()).is_some());
        assert!(registry.lookup(&ProviderId::apple()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(VirtualProvider::new(ProviderId::google())))
            .expect("first register");

        let err = registry
            .register(Arc::new(VirtualProvider::new(ProviderId::google())))
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &RegistryError::DuplicateProvider {
                provider_id: ProviderId::google()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn available_filters_unsupported_platforms() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(VirtualProvider::new(ProviderId::google())))
            .and_then(|r| {
                r.with(Arc::new(
                    VirtualProvider::new(ProviderId::apple()).with_supported(false),
                ))
            })
            .expect("register");

        assert_eq!(registry.available(), vec![ProviderId::google()]);
        assert!(registry.supports(&ProviderId::apple()));
    }
}
