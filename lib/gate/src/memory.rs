//! In-process identity and hint stores.
//!
//! These back the virtual gate used for development without a real identity
//! backend, and double as the fakes in tests. `MemoryIdentityStore` follows
//! the usual hosted-auth semantics: credentials bind a provider subject to one
//! account, linking a credential bound elsewhere is rejected, and deleting an
//! account can be made to demand a recent login.

use async_trait::async_trait;
use authgate_core::{AccountId, ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::IdentityStoreError;
use crate::identity::{Account, Credential, LinkOutcome, LinkedIdentity};
use crate::store::{HintStore, IdentityStore, StoreOperation};

/// Serializable contents of a `MemoryIdentityStore`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryState {
    /// All known accounts keyed by user id.
    #[serde(default)]
    pub accounts: BTreeMap<String, Account>,
    /// The signed-in account, if any.
    #[serde(default)]
    pub current: Option<String>,
    /// When set, deleting the current account fails with `RequiresRecentLogin`.
    #[serde(default)]
    pub require_recent_login: bool,
}

impl MemoryState {
    fn current_mut(&mut self) -> Result<&mut Account, IdentityStoreError> {
        let user_id = self
            .current
            .clone()
            .ok_or(IdentityStoreError::NoCurrentUser)?;
        self.accounts
            .get_mut(&user_id)
            .ok_or(IdentityStoreError::NoCurrentUser)
    }

    fn bound_account(&self, provider_id: &ProviderId, subject: &str) -> Option<String> {
        self.accounts
            .values()
            .find(|a| {
                a.linked
                    .iter()
                    .any(|l| &l.provider_id == provider_id && l.user_id == subject)
            })
            .map(|a| a.user_id.clone())
    }
}

/// In-memory identity backend.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    state: Mutex<MemoryState>,
    aliases: HashMap<ProviderId, ProviderId>,
    failures: Mutex<HashMap<StoreOperation, IdentityStoreError>>,
    delay: Option<Duration>,
}

impl MemoryIdentityStore {
    /// Creates an empty store with nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from previously saved state.
    #[must_use]
    pub fn from_state(state: MemoryState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Reports credentials from `from` under the canonical id `to`.
    #[must_use]
    pub fn with_alias(mut self, from: ProviderId, to: ProviderId) -> Self {
        self.aliases.insert(from, to);
        self
    }

    /// Makes every call wait before answering, as a remote backend would.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> MemoryState {
        self.lock_state().clone()
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: StoreOperation, error: IdentityStoreError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, error);
    }

    /// Toggles whether account deletion demands a recent login.
    pub fn set_require_recent_login(&self, required: bool) {
        self.lock_state().require_recent_login = required;
    }

    /// Signs in an existing account directly, as a cached session would.
    pub fn restore_session(&self, account: Account) {
        let mut state = self.lock_state();
        state.current = Some(account.user_id.clone());
        state.accounts.insert(account.user_id.clone(), account);
    }

    fn lock_state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, operation: StoreOperation) -> Result<(), IdentityStoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&operation)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn canonical(&self, provider_id: ProviderId) -> ProviderId {
        self.aliases.get(&provider_id).cloned().unwrap_or(provider_id)
    }

    fn identity_from(&self, credential: Credential) -> LinkedIdentity {
        LinkedIdentity::new(self.canonical(credential.provider_id), credential.subject)
            .with_email(credential.email)
            .with_display_name(credential.display_name)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn current_account(&self) -> Result<Option<Account>, IdentityStoreError> {
        self.enter(StoreOperation::CurrentAccount).await?;
        let state = self.lock_state();
        Ok(state
            .current
            .as_ref()
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn sign_in_anonymously(&self) -> Result<Account, IdentityStoreError> {
        self.enter(StoreOperation::SignInAnonymously).await?;
        let account = Account {
            user_id: AccountId::new().to_string(),
            email: None,
            is_anonymous: true,
            linked: Vec::new(),
        };
        self.restore_session(account.clone());
        Ok(account)
    }

    async fn sign_in_with_credential(
        &self,
        credential: Credential,
    ) -> Result<Account, IdentityStoreError> {
        self.enter(StoreOperation::SignInWithCredential).await?;
        let identity = self.identity_from(credential);

        let mut state = self.lock_state();
        if let Some(user_id) = state.bound_account(&identity.provider_id, &identity.user_id) {
            state.current = Some(user_id.clone());
            return state
                .accounts
                .get(&user_id)
                .cloned()
                .ok_or(IdentityStoreError::NoCurrentUser);
        }

        let account = Account {
            user_id: AccountId::new().to_string(),
            email: identity.email.clone(),
            is_anonymous: false,
            linked: vec![identity],
        };
        state.current = Some(account.user_id.clone());
        state
            .accounts
            .insert(account.user_id.clone(), account.clone());
        Ok(account)
    }

    async fn link_credential(
        &self,
        credential: Credential,
    ) -> Result<LinkOutcome, IdentityStoreError> {
        self.enter(StoreOperation::LinkCredential).await?;
        let identity = self.identity_from(credential);
        let provider_id = identity.provider_id.clone();

        let mut state = self.lock_state();
        let bound = state.bound_account(&provider_id, &identity.user_id);
        let account = state.current_mut()?;

        if bound.is_some_and(|owner| owner != account.user_id) {
            return Err(IdentityStoreError::CredentialAlreadyInUse { provider_id });
        }
        if account.is_linked(&provider_id) {
            return Err(IdentityStoreError::ProviderAlreadyLinked { provider_id });
        }

        if account.email.is_none() {
            account.email = identity.email.clone();
        }
        account.is_anonymous = false;
        account.linked.push(identity);

        Ok(LinkOutcome {
            account: account.clone(),
            provider_id,
        })
    }

    async fn unlink(&self, provider_id: &ProviderId) -> Result<Account, IdentityStoreError> {
        self.enter(StoreOperation::Unlink).await?;
        let mut state = self.lock_state();
        let account = state.current_mut()?;

        let before = account.linked.len();
        account.linked.retain(|l| &l.provider_id != provider_id);
        if account.linked.len() == before {
            return Err(IdentityStoreError::NoSuchProvider {
                provider_id: provider_id.clone(),
            });
        }
        Ok(account.clone())
    }

    async fn delete_current(&self) -> Result<(), IdentityStoreError> {
        self.enter(StoreOperation::Delete).await?;
        let mut state = self.lock_state();
        if state.require_recent_login {
            return Err(IdentityStoreError::RequiresRecentLogin);
        }
        let user_id = state
            .current
            .take()
            .ok_or(IdentityStoreError::NoCurrentUser)?;
        state.accounts.remove(&user_id);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), IdentityStoreError> {
        self.enter(StoreOperation::SignOut).await?;
        self.lock_state().current = None;
        Ok(())
    }
}

/// In-memory key-value store for the latest-provider hint.
#[derive(Debug, Default)]
pub struct MemoryHintStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryHintStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding previously saved values.
    #[must_use]
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    /// Returns a copy of all stored values.
    #[must_use]
    pub fn values(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HintStore for MemoryHintStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn delete(&self, key: &str) {
        self.lock().remove(key);
    }
}
