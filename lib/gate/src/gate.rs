//! The session gate: a guarded state machine over the current user.
//!
//! `AuthGate` owns the provider registry and the active session. Mutating
//! operations run one at a time behind a transition lock, so preconditions
//! such as "nobody is signed in" cannot be satisfied by two racing callers.
//! Read queries use a separate snapshot and never wait on a transition in
//! flight.
//!
//! Every call into a provider or the identity store is bounded by the
//! configured timeout.

use authgate_core::ProviderId;
use rootcause::prelude::Report;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::GateConfig;
use crate::error::{GateError, IdentityStoreError, ProviderError};
use crate::identity::{Account, Credential};
use crate::policy::{ValidationContext, ValidationPolicy, ValidationReport};
use crate::provider::{CredentialProvider, ProviderRegistry};
use crate::session::{GateState, UserSession};
use crate::store::{HintStore, IdentityStore, LatestProviderHint, StoreOperation};

/// Runs `fut`, failing with `on_timeout(limit_secs)` if it takes longer than
/// `limit`.
pub(crate) async fn bounded<T, E, F>(
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce(u64) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit.as_secs())),
    }
}

/// Outcome of `AuthGate::initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initialized {
    pub session: UserSession,
    /// What the validation policy did; empty when no validation ran.
    pub report: ValidationReport,
}

#[derive(Debug, Default)]
struct Snapshot {
    session: UserSession,
    providers: Vec<ProviderId>,
}

/// Orchestrates sign-in, linking and validation against an identity store.
pub struct AuthGate {
    registry: ProviderRegistry,
    store: Arc<dyn IdentityStore>,
    hint: LatestProviderHint,
    policy: ValidationPolicy,
    call_timeout: Duration,
    transition: Mutex<()>,
    snapshot: RwLock<Snapshot>,
}

impl AuthGate {
    /// Creates a gate. It reports no user until `initialize` runs.
    #[must_use]
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<dyn IdentityStore>,
        hints: Arc<dyn HintStore>,
        config: &GateConfig,
    ) -> Self {
        Self {
            registry,
            store,
            hint: LatestProviderHint::new(hints, config.hint_key.clone()),
            policy: config.validation,
            call_timeout: config.call_timeout(),
            transition: Mutex::new(()),
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Loads the cached session and re-validates it per the configured policy.
    ///
    /// No cached user is a normal outcome and yields the empty session.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProvider` or `InvalidCredential` when the policy
    /// rejects the cached session (which is then signed out), or `Store` if
    /// the current account cannot be read.
    #[instrument(skip(self), fields(policy = ?self.policy))]
    pub async fn initialize(&self) -> Result<Initialized, Report<GateError>> {
        let _guard = self.transition.lock().await;

        let Some(account) = self
            .store_call(StoreOperation::CurrentAccount, self.store.current_account())
            .await?
        else {
            debug!("no cached user");
            self.clear_session();
            return Ok(Initialized {
                session: UserSession::none(),
                report: ValidationReport::default(),
            });
        };

        if account.linked.is_empty() {
            debug!(user_id = %account.user_id, "cached user has no linked identities");
            let session = self.replace_session(&account);
            return Ok(Initialized {
                session,
                report: ValidationReport::default(),
            });
        }

        let ctx = ValidationContext {
            registry: &self.registry,
            store: self.store.as_ref(),
            hint: &self.hint,
            timeout: self.call_timeout,
        };
        match self.policy.apply(&ctx, account).await {
            Ok(validated) => {
                let session = self.replace_session(&validated.account);
                info!(
                    user_id = session.user_id(),
                    pruned = validated.report.pruned.len(),
                    warnings = validated.report.warnings.len(),
                    "restored session"
                );
                Ok(Initialized {
                    session,
                    report: validated.report,
                })
            }
            Err(err) => {
                self.clear_session();
                Err(err)
            }
        }
    }

    /// Creates and signs in an anonymous account.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySignedIn` if a user is signed in, or `Store` if the
    /// backend fails.
    #[instrument(skip(self))]
    pub async fn sign_in_anonymous(&self) -> Result<UserSession, Report<GateError>> {
        let _guard = self.transition.lock().await;
        self.ensure_signed_out()?;

        let account = self
            .store_call(
                StoreOperation::SignInAnonymously,
                self.store.sign_in_anonymously(),
            )
            .await?;
        let session = self.replace_session(&account);
        info!(user_id = session.user_id(), "signed in anonymously");
        Ok(session)
    }

    /// Signs in through a registered provider.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySignedIn`, `UnsupportedProvider`,
    /// `PlatformCredentialCanceled`, or `PlatformCredentialFailed` (which also
    /// covers the backend refusing the credential).
    #[instrument(skip_all, fields(provider_id = %provider_id))]
    pub async fn sign_in(&self, provider_id: &ProviderId) -> Result<UserSession, Report<GateError>> {
        let _guard = self.transition.lock().await;
        self.ensure_signed_out()?;
        let provider = self.provider(provider_id)?;

        let credential = self.acquire_credential(provider_id, &provider).await?;
        let account = bounded(
            self.call_timeout,
            self.store.sign_in_with_credential(credential),
            |after_secs| IdentityStoreError::Timeout { after_secs },
        )
        .await
        .map_err(|e| GateError::PlatformCredentialFailed {
            provider_id: provider_id.clone(),
            reason: e.to_string(),
        })?;

        self.hint.set(provider_id);
        let session = self.replace_session(&account);
        info!(user_id = session.user_id(), "signed in");
        Ok(session)
    }

    /// Links another provider to the signed-in account.
    ///
    /// Returns the backend's canonical id for the linked provider, which may
    /// differ from `provider_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUser` with nobody signed in, `UnsupportedProvider`,
    /// `PlatformCredentialCanceled`/`PlatformCredentialFailed` if no credential
    /// could be obtained, or `LinkFailed` if the backend rejected it.
    #[instrument(skip_all, fields(provider_id = %provider_id))]
    pub async fn link(&self, provider_id: &ProviderId) -> Result<ProviderId, Report<GateError>> {
        let _guard = self.transition.lock().await;
        self.ensure_signed_in()?;
        let provider = self.provider(provider_id)?;

        let credential = self.acquire_credential(provider_id, &provider).await?;
        let outcome = bounded(
            self.call_timeout,
            self.store.link_credential(credential),
            |after_secs| IdentityStoreError::Timeout { after_secs },
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "backend rejected link");
            GateError::LinkFailed {
                provider_id: provider_id.clone(),
                reason: e.to_string(),
            }
        })?;

        self.replace_session(&outcome.account);
        info!(linked = %outcome.provider_id, "linked provider");
        Ok(outcome.provider_id)
    }

    /// Removes a linked provider from the signed-in account.
    ///
    /// Clears the latest-provider hint if it names this provider. Removing the
    /// last provider is allowed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUser` with nobody signed in, or `Store` if the backend
    /// fails.
    #[instrument(skip_all, fields(provider_id = %provider_id))]
    pub async fn unlink(&self, provider_id: &ProviderId) -> Result<(), Report<GateError>> {
        let _guard = self.transition.lock().await;
        self.ensure_signed_in()?;

        let account = self
            .store_call(StoreOperation::Unlink, self.store.unlink(provider_id))
            .await?;
        self.hint.clear_if(provider_id);
        self.replace_session(&account);
        info!("unlinked provider");
        Ok(())
    }

    /// Signs out locally. The remote account is kept.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUser` with nobody signed in, or `Store` if the backend
    /// fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), Report<GateError>> {
        let _guard = self.transition.lock().await;
        self.ensure_signed_in()?;

        self.store_call(StoreOperation::SignOut, self.store.sign_out())
            .await?;
        self.clear_session();
        info!("signed out");
        Ok(())
    }

    /// Deletes the remote account, then signs out.
    ///
    /// Local state is untouched unless the remote delete succeeds, so a
    /// failed delete can be retried after re-authenticating.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUser` with nobody signed in, or `Store` carrying the
    /// backend error unchanged (see `GateError::requires_reauthentication`).
    #[instrument(skip(self))]
    pub async fn delete(&self) -> Result<(), Report<GateError>> {
        let _guard = self.transition.lock().await;
        self.ensure_signed_in()?;

        self.store_call(StoreOperation::Delete, self.store.delete_current())
            .await?;

        if let Err(err) = self
            .store_call(StoreOperation::SignOut, self.store.sign_out())
            .await
        {
            warn!(error = %err, "sign-out after delete failed");
        }
        self.hint.clear();
        self.clear_session();
        info!("deleted account");
        Ok(())
    }

    /// Returns the current session (empty before `initialize`).
    #[must_use]
    pub fn current_user(&self) -> UserSession {
        self.read_snapshot(|s| s.session.clone())
    }

    /// Returns the state-machine position.
    #[must_use]
    pub fn state(&self) -> GateState {
        self.read_snapshot(|s| GateState::of(&s.session, &s.providers))
    }

    /// Returns true if a provider is registered under this id.
    #[must_use]
    pub fn is_support_credential(&self, provider_id: &ProviderId) -> bool {
        self.registry.supports(provider_id)
    }

    /// Returns true if the signed-in account has this provider linked.
    #[must_use]
    pub fn is_connected_provider(&self, provider_id: &ProviderId) -> bool {
        self.read_snapshot(|s| s.providers.contains(provider_id))
    }

    /// Returns the linked providers in backend order.
    #[must_use]
    pub fn connected_providers(&self) -> Vec<ProviderId> {
        self.read_snapshot(|s| s.providers.clone())
    }

    /// Returns the provider registry.
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Returns the persisted latest-provider hint.
    #[must_use]
    pub fn latest_provider(&self) -> Option<ProviderId> {
        self.hint.get()
    }

    fn provider(
        &self,
        provider_id: &ProviderId,
    ) -> Result<Arc<dyn CredentialProvider>, Report<GateError>> {
        let provider = self
            .registry
            .lookup(provider_id)
            .ok_or_else(|| GateError::UnsupportedProvider {
                provider_id: provider_id.clone(),
            })?;
        Ok(provider)
    }

    async fn acquire_credential(
        &self,
        provider_id: &ProviderId,
        provider: &Arc<dyn CredentialProvider>,
    ) -> Result<Credential, Report<GateError>> {
        let result = bounded(self.call_timeout, provider.sign_in(), |after_secs| {
            ProviderError::Timeout { after_secs }
        })
        .await;

        result.map_err(|e| {
            let provider_id = provider_id.clone();
            let err = match e {
                ProviderError::Canceled => {
                    debug!("provider sign-in canceled");
                    GateError::PlatformCredentialCanceled { provider_id }
                }
                other => {
                    warn!(error = %other, "provider sign-in failed");
                    GateError::PlatformCredentialFailed {
                        provider_id,
                        reason: other.to_string(),
                    }
                }
            };
            Report::from(err)
        })
    }

    async fn store_call<T>(
        &self,
        operation: StoreOperation,
        fut: impl Future<Output = Result<T, IdentityStoreError>>,
    ) -> Result<T, Report<GateError>> {
        let value = bounded(self.call_timeout, fut, |after_secs| {
            IdentityStoreError::Timeout { after_secs }
        })
        .await
        .map_err(GateError::store(operation))?;
        Ok(value)
    }

    fn ensure_signed_out(&self) -> Result<(), Report<GateError>> {
        let session = self.current_user();
        if session.is_valid() {
            return Err(GateError::AlreadySignedIn {
                user_id: session.user_id().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn ensure_signed_in(&self) -> Result<(), Report<GateError>> {
        if !self.current_user().is_valid() {
            return Err(GateError::InvalidUser.into());
        }
        Ok(())
    }

    fn read_snapshot<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        f(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace_session(&self, account: &Account) -> UserSession {
        let next = Snapshot {
            session: UserSession::from(account),
            providers: account.provider_ids(),
        };
        let session = next.session.clone();
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
        debug!(state = ?self.state(), "session replaced");
        session
    }

    fn clear_session(&self) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Snapshot::default();
        debug!("session cleared");
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("call_timeout", &self.call_timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
