//! Startup re-validation of a cached session.
//!
//! Every validation is a round trip to a provider, so the policy trades
//! thoroughness against cost:
//! - `ValidateLatest` checks a single identity (the hinted one, else the first
//!   linked) and drops the whole session if it fails.
//! - `ValidateAll` checks every identity whose provider is registered and
//!   unlinks the ones that fail, keeping the session.

use authgate_core::ProviderId;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{GateError, IdentityStoreError, ProviderError};
use crate::gate::bounded;
use crate::identity::{Account, LinkedIdentity};
use crate::provider::{CredentialProvider, ProviderRegistry};
use crate::store::{IdentityStore, LatestProviderHint};

/// Which linked identities to re-validate at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationPolicy {
    /// Validate only the most recently used identity.
    #[default]
    #[serde(rename = "latest", alias = "validate_latest")]
    ValidateLatest,
    /// Validate every linked identity and prune the ones that fail.
    #[serde(rename = "all", alias = "validate_all")]
    ValidateAll,
}

/// A non-fatal problem encountered while validating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// The provider errored instead of answering; counted as a failure.
    ValidationErrored {
        provider_id: ProviderId,
        reason: String,
    },
    /// Pruning a failed identity did not succeed.
    UnlinkFailed {
        provider_id: ProviderId,
        error: IdentityStoreError,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationErrored {
                provider_id,
                reason,
            } => write!(f, "validating {provider_id} errored: {reason}"),
            Self::UnlinkFailed { provider_id, error } => {
                write!(f, "unlinking {provider_id} failed: {error}")
            }
        }
    }
}

/// What a validation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Identities that passed validation.
    pub validated: Vec<ProviderId>,
    /// Identities skipped because their provider is not registered.
    pub skipped: Vec<ProviderId>,
    /// Identities that failed validation and were unlinked.
    pub pruned: Vec<ProviderId>,
    pub warnings: Vec<ValidationWarning>,
}

/// Collaborators a validation pass needs.
pub(crate) struct ValidationContext<'a> {
    pub registry: &'a ProviderRegistry,
    pub store: &'a dyn IdentityStore,
    pub hint: &'a LatestProviderHint,
    pub timeout: Duration,
}

/// Result of a validation pass that kept the session.
#[derive(Debug)]
pub(crate) struct Validated {
    pub account: Account,
    pub report: ValidationReport,
}

impl ValidationPolicy {
    /// Runs the policy against an account with at least one linked identity.
    ///
    /// On failure the remote session has already been signed out.
    pub(crate) async fn apply(
        self,
        ctx: &ValidationContext<'_>,
        account: Account,
    ) -> Result<Validated, Report<GateError>> {
        match self {
            Self::ValidateLatest => validate_latest(ctx, account).await,
            Self::ValidateAll => Ok(validate_all(ctx, account).await),
        }
    }
}

/// Picks the identity named by the hint, else the first in snapshot order.
pub(crate) fn select_latest<'a>(
    linked: &'a [LinkedIdentity],
    hint: Option<&ProviderId>,
) -> Option<&'a LinkedIdentity> {
    hint.and_then(|h| linked.iter().find(|l| &l.provider_id == h))
        .or_else(|| linked.first())
}

/// Asks a provider about an identity. `Err` carries the reason a provider
/// errored or timed out.
async fn check(
    provider: &Arc<dyn CredentialProvider>,
    identity: &LinkedIdentity,
    timeout: Duration,
) -> Result<bool, String> {
    bounded(timeout, provider.validate(identity), |after_secs| {
        ProviderError::Timeout { after_secs }
    })
    .await
    .map_err(|e| e.to_string())
}

async fn validate_latest(
    ctx: &ValidationContext<'_>,
    account: Account,
) -> Result<Validated, Report<GateError>> {
    let hint = ctx.hint.get();
    let Some(identity) = select_latest(&account.linked, hint.as_ref()) else {
        return Ok(Validated {
            account,
            report: ValidationReport::default(),
        });
    };
    let provider_id = identity.provider_id.clone();
    debug!(%provider_id, hinted = ?hint, "validating latest identity");

    let Some(provider) = ctx.registry.lookup(&provider_id) else {
        warn!(%provider_id, "latest identity uses an unregistered provider, signing out");
        force_sign_out(ctx).await;
        return Err(GateError::UnsupportedProvider { provider_id }.into());
    };

    match check(&provider, identity, ctx.timeout).await {
        Ok(true) => Ok(Validated {
            report: ValidationReport {
                validated: vec![provider_id],
                ..ValidationReport::default()
            },
            account,
        }),
        Ok(false) => {
            warn!(%provider_id, "latest identity failed validation, signing out");
            force_sign_out(ctx).await;
            Err(GateError::InvalidCredential { provider_id }.into())
        }
        Err(reason) => {
            warn!(%provider_id, %reason, "latest identity validation errored, signing out");
            force_sign_out(ctx).await;
            Err(GateError::InvalidCredential { provider_id }.into())
        }
    }
}

/// Signs out remotely and clears the hint. A failed sign-out is logged; the
/// caller reports the validation failure either way.
async fn force_sign_out(ctx: &ValidationContext<'_>) {
    let result = bounded(ctx.timeout, ctx.store.sign_out(), |after_secs| {
        IdentityStoreError::Timeout { after_secs }
    })
    .await;
    if let Err(error) = result {
        warn!(%error, "forced sign-out failed");
    }
    ctx.hint.clear();
}

async fn validate_all(ctx: &ValidationContext<'_>, mut account: Account) -> Validated {
    let mut report = ValidationReport::default();
    let snapshot = account.linked.clone();

    for identity in &snapshot {
        let provider_id = &identity.provider_id;
        let Some(provider) = ctx.registry.lookup(provider_id) else {
            debug!(%provider_id, "skipping unregistered provider");
            report.skipped.push(provider_id.clone());
            continue;
        };

        match check(&provider, identity, ctx.timeout).await {
            Ok(true) => {
                report.validated.push(provider_id.clone());
                continue;
            }
            Ok(false) => {}
            Err(reason) => {
                report.warnings.push(ValidationWarning::ValidationErrored {
                    provider_id: provider_id.clone(),
                    reason,
                });
            }
        }

        let unlinked = bounded(ctx.timeout, ctx.store.unlink(provider_id), |after_secs| {
            IdentityStoreError::Timeout { after_secs }
        })
        .await;
        match unlinked {
            Ok(updated) => {
                info!(%provider_id, "pruned identity that failed validation");
                ctx.hint.clear_if(provider_id);
                account = updated;
                report.pruned.push(provider_id.clone());
            }
            Err(error) => {
                warn!(%provider_id, %error, "failed to prune identity");
                report.warnings.push(ValidationWarning::UnlinkFailed {
                    provider_id: provider_id.clone(),
                    error,
                });
            }
        }
    }

    Validated { account, report }
}
