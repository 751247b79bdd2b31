//! The current-user value and the gate's observable state.
//!
//! A `UserSession` is an immutable snapshot of who is signed in. The empty
//! session (no user id) is the canonical "nobody" value; the gate replaces its
//! session wholesale on every transition and never mutates one in place.

use authgate_core::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::Account;

/// Describes the current identity, or nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    user_id: String,
    email: Option<String>,
    is_anonymous: bool,
}

impl UserSession {
    /// Creates a session for the given user.
    #[must_use]
    pub fn new(user_id: impl Into<String>, email: Option<String>, is_anonymous: bool) -> Self {
        Self {
            user_id: user_id.into(),
            email,
            is_anonymous,
        }
    }

    /// The "no user" sentinel.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns the backend user id (empty for the sentinel).
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the user's email address, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns true for anonymous accounts.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    /// Returns true if this session identifies a user.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.user_id.is_empty()
    }
}

impl From<&Account> for UserSession {
    fn from(account: &Account) -> Self {
        Self::new(
            account.user_id.clone(),
            account.email.clone(),
            account.is_anonymous,
        )
    }
}

impl fmt::Display for UserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.email, self.is_valid()) {
            (_, false) => write!(f, "<none>"),
            (Some(email), true) => write!(f, "{}, {email}", self.user_id),
            (None, true) => write!(f, "{}", self.user_id),
        }
    }
}

/// The gate's state-machine position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No user is signed in.
    Unauthenticated,
    /// A user is signed in with no linked provider identities.
    Anonymous,
    /// A user is signed in with at least one linked provider.
    Authenticated { providers: Vec<ProviderId> },
}

impl GateState {
    pub(crate) fn of(session: &UserSession, providers: &[ProviderId]) -> Self {
        if !session.is_valid() {
            Self::Unauthenticated
        } else if providers.is_empty() {
            Self::Anonymous
        } else {
            Self::Authenticated {
                providers: providers.to_vec(),
            }
        }
    }
}
