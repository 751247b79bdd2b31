//! Snapshots read from the identity backend and credentials handed to it.

use authgate_core::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One provider's identity bound to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIdentity {
    /// The provider this identity came from.
    pub provider_id: ProviderId,
    /// The provider-side user id.
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl LinkedIdentity {
    /// Creates a linked identity with no profile fields.
    #[must_use]
    pub fn new(provider_id: ProviderId, user_id: impl Into<String>) -> Self {
        Self {
            provider_id,
            user_id: user_id.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }
}

/// The backend's view of the current account.
///
/// `linked` preserves the backend's ordering; validation relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub email: Option<String>,
    pub is_anonymous: bool,
    pub linked: Vec<LinkedIdentity>,
}

impl Account {
    /// Returns the ids of all linked providers in snapshot order.
    #[must_use]
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.linked.iter().map(|l| l.provider_id.clone()).collect()
    }

    /// Returns true if the given provider is linked.
    #[must_use]
    pub fn is_linked(&self, provider_id: &ProviderId) -> bool {
        self.linked.iter().any(|l| &l.provider_id == provider_id)
    }
}

/// A credential produced by a provider's platform sign-in flow.
///
/// The gate treats it as opaque and passes it straight to the identity store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub provider_id: ProviderId,
    /// The provider-side subject the credential asserts.
    pub subject: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub id_token: Option<String>,
}

impl Credential {
    /// Creates a credential for a provider subject.
    #[must_use]
    pub fn new(provider_id: ProviderId, subject: impl Into<String>) -> Self {
        Self {
            provider_id,
            subject: subject.into(),
            email: None,
            display_name: None,
            id_token: None,
        }
    }

    /// Sets the email.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: Option<String>) -> Self {
        self.id_token = token;
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider_id", &self.provider_id)
            .field("subject", &self.subject)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Result of linking a credential to the current account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// The account after linking.
    pub account: Account,
    /// The backend's canonical id for the linked provider.
    pub provider_id: ProviderId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            user_id: "uid_1".to_string(),
            email: None,
            is_anonymous: false,
            linked: vec![
                LinkedIdentity::new(ProviderId::apple(), "a-1"),
                LinkedIdentity::new(ProviderId::google(), "g-1"),
            ],
        }
    }

    #[test]
    fn provider_ids_keep_snapshot_order() {
        assert_eq!(
            account().provider_ids(),
            vec![ProviderId::apple(), ProviderId::google()]
        );
    }

    #[test]
    fn is_linked() {
        let account = account();
        assert!(account.is_linked(&ProviderId::google()));
        assert!(!account.is_linked(&ProviderId::new("github.com")));
    }

    #[test]
    fn credential_debug_redacts_token() {
        let credential = Credential::new(ProviderId::google(), "g-1")
            .with_id_token(Some("secret-token".to_string()));
        let debug = format!("{credential:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }
}
