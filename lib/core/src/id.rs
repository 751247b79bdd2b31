//! Identifier types for providers and accounts.
//!
//! Provider identifiers are opaque strings chosen by the identity backend
//! (`google.com`, `apple.com`, ...). Account identifiers are ULIDs minted by
//! in-process identity stores; remote backends may use any non-empty string.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Stable key identifying a credential provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Provider id reported by the backend for Google sign-in.
    pub const GOOGLE: &'static str = "google.com";
    /// Provider id reported by the backend for Sign in with Apple.
    pub const APPLE: &'static str = "apple.com";

    /// Creates a provider ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The Google provider id.
    #[must_use]
    pub fn google() -> Self {
        Self::new(Self::GOOGLE)
    }

    /// The Apple provider id.
    #[must_use]
    pub fn apple() -> Self {
        Self::new(Self::APPLE)
    }

    /// Returns the provider ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for ProviderId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProviderId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Identifier for an account minted by an in-process identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Ulid);

impl AccountId {
    const PREFIX: &'static str = "uid";

    /// Creates a new ID with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_display() {
        assert_eq!(ProviderId::google().to_string(), "google.com");
        assert_eq!(ProviderId::apple().as_str(), "apple.com");
    }

    #[test]
    fn provider_id_compares_with_str() {
        let id: ProviderId = "apple.com".into();
        assert!(id == "apple.com");
        assert_ne!(id, ProviderId::google());
    }

    #[test]
    fn provider_id_serializes_transparently() {
        let json = serde_json::to_string(&ProviderId::google()).expect("serialize");
        assert_eq!(json, "\"google.com\"");
    }

    #[test]
    fn account_id_display_format() {
        let id = AccountId::new();
        assert!(id.to_string().starts_with("uid_"));
    }

    #[test]
    fn account_ids_are_unique() {
        assert_ne!(AccountId::new(), AccountId::new());
    }
}
