//! Error types for the gate crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GateError`: Failures surfaced by gate operations to callers
//! - `ProviderError`: Failures reported by a credential provider
//! - `IdentityStoreError`: Failures reported by the identity backend
//! - `RegistryError`: Provider registry configuration errors

use authgate_core::ProviderId;
use std::fmt;

use crate::store::StoreOperation;

/// Errors from gate operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Sign-in attempted while a valid session exists.
    AlreadySignedIn { user_id: String },
    /// Provider id is not registered with the gate.
    UnsupportedProvider { provider_id: ProviderId },
    /// The provider could not produce a credential, or the backend refused it.
    PlatformCredentialFailed {
        provider_id: ProviderId,
        reason: String,
    },
    /// The user canceled the provider's sign-in flow.
    PlatformCredentialCanceled { provider_id: ProviderId },
    /// A credential was obtained but the backend rejected linking it.
    LinkFailed {
        provider_id: ProviderId,
        reason: String,
    },
    /// A previously linked identity failed re-validation.
    InvalidCredential { provider_id: ProviderId },
    /// The operation requires a signed-in user.
    InvalidUser,
    /// The facade was used before a gate was installed.
    NotInitialized,
    /// The identity store failed an operation that is not otherwise classified.
    Store {
        operation: StoreOperation,
        error: IdentityStoreError,
    },
}

impl GateError {
    /// Returns true if the caller can recover by re-authenticating and retrying.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            Self::Store {
                error: IdentityStoreError::RequiresRecentLogin,
                ..
            }
        )
    }

    /// Returns true if the failure was a user cancellation.
    ///
    /// UI callers typically suppress error messaging for these.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::PlatformCredentialCanceled { .. })
    }

    pub(crate) fn store(operation: StoreOperation) -> impl FnOnce(IdentityStoreError) -> Self {
        move |error| Self::Store { operation, error }
    }
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySignedIn { user_id } => {
                write!(f, "already signed in as {user_id}")
            }
            Self::UnsupportedProvider { provider_id } => {
                write!(f, "unsupported provider: {provider_id}")
            }
            Self::PlatformCredentialFailed {
                provider_id,
                reason,
            } => {
                write!(f, "{provider_id} credential failed: {reason}")
            }
            Self::PlatformCredentialCanceled { provider_id } => {
                write!(f, "{provider_id} sign-in canceled")
            }
            Self::LinkFailed {
                provider_id,
                reason,
            } => {
                write!(f, "link failed for {provider_id}: {reason}")
            }
            Self::InvalidCredential { provider_id } => {
                write!(f, "credential for {provider_id} is no longer valid")
            }
            Self::InvalidUser => write!(f, "no signed-in user"),
            Self::NotInitialized => write!(f, "gate has not been initialized"),
            Self::Store { operation, error } => {
                write!(f, "identity store {operation} failed: {error}")
            }
        }
    }
}

impl std::error::Error for GateError {}

/// Errors from credential provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The platform flow failed.
    Failed { reason: String },
    /// The user canceled the platform flow.
    Canceled,
    /// The provider did not answer in time.
    Timeout { after_secs: u64 },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "provider failed: {reason}"),
            Self::Canceled => write!(f, "canceled by user"),
            Self::Timeout { after_secs } => {
                write!(f, "provider timed out after {after_secs}s")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from the identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityStoreError {
    /// The backend requires a fresh sign-in before this operation.
    RequiresRecentLogin,
    /// The credential is already bound to a different account.
    CredentialAlreadyInUse { provider_id: ProviderId },
    /// The current account already has this provider linked.
    ProviderAlreadyLinked { provider_id: ProviderId },
    /// The current account has no such provider linked.
    NoSuchProvider { provider_id: ProviderId },
    /// There is no current account.
    NoCurrentUser,
    /// The backend rejected the credential.
    InvalidCredential { reason: String },
    /// The backend could not be reached.
    Unavailable { reason: String },
    /// The backend did not answer in time.
    Timeout { after_secs: u64 },
}

impl fmt::Display for IdentityStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequiresRecentLogin => write!(f, "requires recent login"),
            Self::CredentialAlreadyInUse { provider_id } => {
                write!(f, "{provider_id} credential already in use by another account")
            }
            Self::ProviderAlreadyLinked { provider_id } => {
                write!(f, "{provider_id} is already linked")
            }
            Self::NoSuchProvider { provider_id } => {
                write!(f, "{provider_id} is not linked")
            }
            Self::NoCurrentUser => write!(f, "no current user"),
            Self::InvalidCredential { reason } => {
                write!(f, "invalid credential: {reason}")
            }
            Self::Unavailable { reason } => {
                write!(f, "backend unavailable: {reason}")
            }
            Self::Timeout { after_secs } => {
                write!(f, "backend timed out after {after_secs}s")
            }
        }
    }
}

impl std::error::Error for IdentityStoreError {}

/// Errors from provider registry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two providers reported the same id.
    DuplicateProvider { provider_id: ProviderId },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateProvider { provider_id } => {
                write!(f, "provider registered twice: {provider_id}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
