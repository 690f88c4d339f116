//! Authentication providers.
//!
//! A provider turns an [`AuthenticationRequest`] into an
//! [`AuthenticatedPrincipal`] or a generic failure.

use std::sync::Arc;

use super::error::{SecurityError, SecurityResult};
use super::identity::IdentityStore;
use super::password::PasswordVerifier;
use super::principal::{AuthenticatedPrincipal, AuthenticationRequest};

/// Raw value encoded once per provider and verified against when the
/// username is unknown.
const TIMING_PARITY_CREDENTIAL: &str = "warden-timing-parity";

/// Trait for verifying an authentication attempt.
pub trait AuthenticationProvider: Send + Sync {
    /// Authenticate the request.
    ///
    /// Implementations must return [`SecurityError::AuthenticationFailed`] for
    /// every credential problem, whichever check failed. Only a degraded
    /// identity source may surface as a distinct error.
    fn authenticate(&self, request: &AuthenticationRequest) -> SecurityResult<AuthenticatedPrincipal>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Provider that checks credentials against an [`IdentityStore`] with a
/// [`PasswordVerifier`].
///
/// Both collaborators are injected at construction; the provider is immutable
/// afterwards.
pub struct StoreAuthenticationProvider {
    store: Arc<dyn IdentityStore>,
    verifier: Arc<dyn PasswordVerifier>,
    timing_parity_credential: String,
}

impl StoreAuthenticationProvider {
    /// Create a provider.
    ///
    /// Fails only if the verifier cannot encode the timing-parity credential.
    pub fn new(store: Arc<dyn IdentityStore>, verifier: Arc<dyn PasswordVerifier>) -> SecurityResult<Self> {
        let timing_parity_credential = verifier.encode(TIMING_PARITY_CREDENTIAL)?;
        Ok(Self {
            store,
            verifier,
            timing_parity_credential,
        })
    }
}

impl AuthenticationProvider for StoreAuthenticationProvider {
    fn authenticate(&self, request: &AuthenticationRequest) -> SecurityResult<AuthenticatedPrincipal> {
        let identity = match self.store.find_by_username(&request.username) {
            Ok(identity) => identity,
            Err(SecurityError::IdentityNotFound(_)) => {
                // Same verifier work as a wrong password.
                let _ = self
                    .verifier
                    .verify(&request.credential, &self.timing_parity_credential);
                tracing::debug!(
                    username = %request.username,
                    source = self.store.source_name(),
                    "authentication failed: unknown username"
                );
                return Err(SecurityError::AuthenticationFailed);
            }
            Err(e) if e.is_upstream() => {
                tracing::warn!(
                    error = %e,
                    source = self.store.source_name(),
                    "identity source unavailable"
                );
                return Err(e);
            }
            Err(e) => {
                tracing::debug!(error = %e, "authentication failed: identity lookup error");
                return Err(SecurityError::AuthenticationFailed);
            }
        };

        if !self.verifier.verify(&request.credential, identity.credential()) {
            tracing::debug!(
                username = %request.username,
                verifier = self.verifier.name(),
                "authentication failed: credential mismatch"
            );
            return Err(SecurityError::AuthenticationFailed);
        }

        Ok(AuthenticatedPrincipal::new(
            identity.username(),
            identity.authorities().clone(),
        ))
    }

    fn name(&self) -> &str {
        "store"
    }
}
