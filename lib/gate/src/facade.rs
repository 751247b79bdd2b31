//! Process-wide access to the active gate.
//!
//! Applications that pass an `Arc<AuthGate>` around explicitly do not need
//! this. For callers that want a single ambient handle (UI event handlers,
//! for instance) `GateFacade` holds at most one installed gate and delegates
//! to it; `GateFacade::global()` is the shared instance.

use authgate_core::ProviderId;
use rootcause::prelude::Report;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::GateError;
use crate::gate::{AuthGate, Initialized};
use crate::session::UserSession;

/// Holder for the active gate.
#[derive(Debug, Default)]
pub struct GateFacade {
    gate: RwLock<Option<Arc<AuthGate>>>,
}

impl GateFacade {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide facade.
    pub fn global() -> &'static GateFacade {
        static GLOBAL: OnceLock<GateFacade> = OnceLock::new();
        GLOBAL.get_or_init(GateFacade::new)
    }

    /// Installs `gate`, replacing any previous one, and initializes it.
    ///
    /// The gate stays installed even if initialization fails, so callers can
    /// continue with a fresh sign-in.
    ///
    /// # Errors
    ///
    /// Returns whatever `AuthGate::initialize` returns.
    pub async fn install(&self, gate: Arc<AuthGate>) -> Result<Initialized, Report<GateError>> {
        *self.gate.write().unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate.initialize().await
    }

    /// Returns the installed gate, if any.
    #[must_use]
    pub fn gate(&self) -> Option<Arc<AuthGate>> {
        self.gate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require(&self) -> Result<Arc<AuthGate>, Report<GateError>> {
        Ok(self.gate().ok_or(GateError::NotInitialized)?)
    }

    /// Returns the current user, or the empty session if no gate is installed.
    #[must_use]
    pub fn current_user(&self) -> UserSession {
        self.gate()
            .map(|g| g.current_user())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_support_credential(&self, provider_id: &ProviderId) -> bool {
        self.gate()
            .is_some_and(|g| g.is_support_credential(provider_id))
    }

    #[must_use]
    pub fn is_connected_provider(&self, provider_id: &ProviderId) -> bool {
        self.gate()
            .is_some_and(|g| g.is_connected_provider(provider_id))
    }

    #[must_use]
    pub fn connected_providers(&self) -> Vec<ProviderId> {
        self.gate()
            .map(|g| g.connected_providers())
            .unwrap_or_default()
    }

    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever the gate returns.
    pub async fn sign_in_anonymous(&self) -> Result<UserSession, Report<GateError>> {
        self.require()?.sign_in_anonymous().await
    }

    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever the gate returns.
    pub async fn sign_in(&self, provider_id: &ProviderId) -> Result<UserSession, Report<GateError>> {
        self.require()?.sign_in(provider_id).await
    }

    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever the gate returns.
    pub async fn link(&self, provider_id: &ProviderId) -> Result<ProviderId, Report<GateError>> {
        self.require()?.link(provider_id).await
    }

    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever the gate returns.
    pub async fn unlink(&self, provider_id: &ProviderId) -> Result<(), Report<GateError>> {
        self.require()?.unlink(provider_id).await
    }

    /// Signs out of a single provider by unlinking it.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever `AuthGate::unlink` returns.
    pub async fn sign_out_provider(&self, provider_id: &ProviderId) -> Result<(), Report<GateError>> {
        self.unlink(provider_id).await
    }

    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever the gate returns.
    pub async fn sign_out(&self) -> Result<(), Report<GateError>> {
        self.require()?.sign_out().await
    }

    /// # Errors
    ///
    /// Returns `NotInitialized`, or whatever the gate returns.
    pub async fn delete(&self) -> Result<(), Report<GateError>> {
        self.require()?.delete().await
    }

    /// Nobody is signed in and the provider is not connected.
    #[must_use]
    pub fn can_sign_in(&self, provider_id: &ProviderId) -> bool {
        self.gate().is_some_and(|g| {
            !g.current_user().is_valid() && !g.is_connected_provider(provider_id)
        })
    }

    /// Someone is signed in and the provider is not yet connected.
    #[must_use]
    pub fn can_link(&self, provider_id: &ProviderId) -> bool {
        self.gate().is_some_and(|g| {
            g.current_user().is_valid() && !g.is_connected_provider(provider_id)
        })
    }

    /// Someone is signed in and the provider is connected.
    #[must_use]
    pub fn can_sign_out(&self, provider_id: &ProviderId) -> bool {
        self.gate().is_some_and(|g| {
            g.current_user().is_valid() && g.is_connected_provider(provider_id)
        })
    }
}
