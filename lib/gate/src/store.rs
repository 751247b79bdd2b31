//! Collaborator traits for the identity backend and the hint store.

use async_trait::async_trait;
use authgate_core::ProviderId;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::IdentityStoreError;
use crate::identity::{Account, Credential, LinkOutcome};

/// The backend that owns accounts and their linked identities.
///
/// Every call may suspend; the gate never retries a failed call.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Reads the current account, if anyone is signed in.
    async fn current_account(&self) -> Result<Option<Account>, IdentityStoreError>;

    /// Creates and signs in a new anonymous account.
    async fn sign_in_anonymously(&self) -> Result<Account, IdentityStoreError>;

    /// Exchanges a provider credential for a signed-in account.
    async fn sign_in_with_credential(
        &self,
        credential: Credential,
    ) -> Result<Account, IdentityStoreError>;

    /// Links a credential to the current account.
    async fn link_credential(&self, credential: Credential)
    -> Result<LinkOutcome, IdentityStoreError>;

    /// Removes a provider from the current account.
    async fn unlink(&self, provider_id: &ProviderId) -> Result<Account, IdentityStoreError>;

    /// Deletes the current account remotely.
    async fn delete_current(&self) -> Result<(), IdentityStoreError>;

    /// Signs out locally; the remote account is kept.
    async fn sign_out(&self) -> Result<(), IdentityStoreError>;
}

/// Identity store operations, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    CurrentAccount,
    SignInAnonymously,
    SignInWithCredential,
    LinkCredential,
    Unlink,
    Delete,
    SignOut,
}

impl StoreOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentAccount => "current_account",
            Self::SignInAnonymously => "sign_in_anonymously",
            Self::SignInWithCredential => "sign_in_with_credential",
            Self::LinkCredential => "link_credential",
            Self::Unlink => "unlink",
            Self::Delete => "delete",
            Self::SignOut => "sign_out",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value storage used for the latest-provider hint.
pub trait HintStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn delete(&self, key: &str);
}

/// The persisted "most recently used provider" marker.
#[derive(Clone)]
pub struct LatestProviderHint {
    store: Arc<dyn HintStore>,
    key: String,
}

impl LatestProviderHint {
    #[must_use]
    pub fn new(store: Arc<dyn HintStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Reads the hint; blank values count as absent.
    #[must_use]
    pub fn get(&self) -> Option<ProviderId> {
        self.store
            .get(&self.key)
            .filter(|v| !v.trim().is_empty())
            .map(ProviderId::from)
    }

    pub fn set(&self, provider_id: &ProviderId) {
        debug!(%provider_id, "remembering latest provider");
        self.store.set(&self.key, provider_id.as_str());
    }

    pub fn clear(&self) {
        debug!("clearing latest provider");
        self.store.delete(&self.key);
    }

    /// Clears the hint only if it currently names `provider_id`.
    pub fn clear_if(&self, provider_id: &ProviderId) {
        if self.get().as_ref() == Some(provider_id) {
            self.clear();
        }
    }
}

impl fmt::Debug for LatestProviderHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LatestProviderHint")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHintStore;

    fn hint() -> (Arc<MemoryHintStore>, LatestProviderHint) {
        let store = Arc::new(MemoryHintStore::new());
        let hint = LatestProviderHint::new(store.clone(), "latest");
        (store, hint)
    }

    #[test]
    fn set_and_get() {
        let (store, hint) = hint();
        assert_eq!(hint.get(), None);

        hint.set(&ProviderId::google());
        assert_eq!(hint.get(), Some(ProviderId::google()));
        assert_eq!(store.get("latest").as_deref(), Some("google.com"));
    }

    #[test]
    fn blank_value_is_absent() {
        let (store, hint) = hint();
        store.set("latest", "  ");
        assert_eq!(hint.get(), None);
    }

    #[test]
    fn clear_if_only_matches_same_provider() {
        let (_, hint) = hint();
        hint.set(&ProviderId::google());

        hint.clear_if(&ProviderId::apple());
        assert_eq!(hint.get(), Some(ProviderId::google()));

        hint.clear_if(&ProviderId::google());
        assert_eq!(hint.get(), None);
    }

    #[test]
    fn store_operation_display() {
        assert_eq!(StoreOperation::SignInWithCredential.to_string(), "sign_in_with_credential");
    }
}
