//! A scriptable credential provider for development and tests.

use async_trait::async_trait;
use authgate_core::ProviderId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ProviderError;
use crate::identity::{Credential, LinkedIdentity};
use crate::provider::CredentialProvider;

/// What a virtual provider's sign-in flow does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignInBehavior {
    /// Produce a credential for this subject.
    Succeed {
        subject: String,
        #[serde(default)]
        email: Option<String>,
    },
    /// Fail with a reason.
    Fail { reason: String },
    /// Behave as if the user closed the sign-in sheet.
    Cancel,
}

/// What a virtual provider answers when asked to re-validate an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidateBehavior {
    Valid,
    Invalid,
    /// Fail with a transport error.
    Error,
}

/// Provider whose outcomes are fixed at construction.
#[derive(Debug)]
pub struct VirtualProvider {
    id: ProviderId,
    supported: bool,
    sign_in: SignInBehavior,
    validate: ValidateBehavior,
    delay: Option<Duration>,
    sign_in_calls: AtomicUsize,
    validate_calls: AtomicUsize,
}

impl VirtualProvider {
    /// Creates a supported provider that signs in as `virtual-user` and
    /// always validates.
    #[must_use]
    pub fn new(id: ProviderId) -> Self {
        Self {
            id,
            supported: true,
            sign_in: SignInBehavior::Succeed {
                subject: "virtual-user".to_string(),
                email: None,
            },
            validate: ValidateBehavior::Valid,
            delay: None,
            sign_in_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_supported(mut self, supported: bool) -> Self {
        self.supported = supported;
        self
    }

    #[must_use]
    pub fn with_sign_in(mut self, behavior: SignInBehavior) -> Self {
        self.sign_in = behavior;
        self
    }

    #[must_use]
    pub fn with_validate(mut self, behavior: ValidateBehavior) -> Self {
        self.validate = behavior;
        self
    }

    /// Makes every call wait before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `sign_in` was called.
    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    /// Number of times `validate` was called.
    #[must_use]
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CredentialProvider for VirtualProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn sign_in(&self) -> Result<Credential, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match &self.sign_in {
            SignInBehavior::Succeed { subject, email } => Ok(Credential::new(
                self.id.clone(),
                subject.clone(),
            )
            .with_email(email.clone())
            .with_id_token(Some(format!("virtual.{}.{subject}", self.id)))),
            SignInBehavior::Fail { reason } => Err(ProviderError::Failed {
                reason: reason.clone(),
            }),
            SignInBehavior::Cancel => Err(ProviderError::Canceled),
        }
    }

    async fn validate(&self, _identity: &LinkedIdentity) -> Result<bool, ProviderError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        match self.validate {
            ValidateBehavior::Valid => Ok(true),
            ValidateBehavior::Invalid => Ok(false),
            ValidateBehavior::Error => Err(ProviderError::Failed {
                reason: "validation transport error".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_provider_succeeds() {
        let provider = VirtualProvider::new(ProviderId::google());
        let credential = provider.sign_in().await.expect("sign in");

        assert_eq!(credential.provider_id, ProviderId::google());
        assert_eq!(credential.subject, "virtual-user");
        assert_eq!(
            credential.id_token.as_deref(),
            Some("virtual.google.com.virtual-user")
        );
        assert!(!format!("{credential:?}").contains("virtual.google.com"));
        assert_eq!(provider.sign_in_calls(), 1);
    }

    #[tokio::test]
    async fn cancel_and_fail_behaviors() {
        let canceled = VirtualProvider::new(ProviderId::apple()).with_sign_in(SignInBehavior::Cancel);
        assert_eq!(canceled.sign_in().await.unwrap_err(), ProviderError::Canceled);

        let failed = VirtualProvider::new(ProviderId::apple()).with_sign_in(SignInBehavior::Fail {
            reason: "no network".to_string(),
        });
        assert!(matches!(
            failed.sign_in().await.unwrap_err(),
            ProviderError::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn validate_behaviors() {
        let identity = LinkedIdentity::new(ProviderId::google(), "g-1");

        let invalid = VirtualProvider::new(ProviderId::google()).with_validate(ValidateBehavior::Invalid);
        assert!(!invalid.validate(&identity).await.expect("validate"));

        let erroring = VirtualProvider::new(ProviderId::google()).with_validate(ValidateBehavior::Error);
        assert!(erroring.validate(&identity).await.is_err());
        assert_eq!(erroring.validate_calls(), 1);
    }

    #[test]
    fn sign_in_behavior_deserializes_tagged() {
        let behavior: SignInBehavior =
            serde_json::from_str(r#"{"outcome":"succeed","subject":"alice"}"#).expect("parse");
        assert_eq!(
            behavior,
            SignInBehavior::Succeed {
                subject: "alice".to_string(),
                email: None
            }
        );
    }
}
