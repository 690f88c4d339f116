//! Authentication manager: the entry point the filter chain calls.

use std::sync::Arc;

use super::error::{SecurityError, SecurityResult};
use super::principal::{AuthenticatedPrincipal, AuthenticationRequest};
use super::provider::AuthenticationProvider;

/// Delegates to an ordered list of providers.
///
/// The first provider that succeeds wins. When every provider fails the
/// result is [`SecurityError::UpstreamUnavailable`] if any of them reported a
/// degraded identity source, and [`SecurityError::AuthenticationFailed`]
/// otherwise.
#[derive(Clone)]
pub struct AuthenticationManager {
    providers: Vec<Arc<dyn AuthenticationProvider>>,
}

impl AuthenticationManager {
    /// Start building a manager.
    pub fn builder() -> AuthenticationManagerBuilder {
        AuthenticationManagerBuilder::default()
    }

    /// Manager with a single provider. Equivalent to direct delegation.
    pub fn single(provider: Arc<dyn AuthenticationProvider>) -> Self {
        Self {
            providers: vec![provider],
        }
    }

    /// Number of configured providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Authenticate against the configured providers in order.
    pub fn authenticate(&self, request: &AuthenticationRequest) -> SecurityResult<AuthenticatedPrincipal> {
        let mut upstream_failure: Option<SecurityError> = None;

        for provider in &self.providers {
            match provider.authenticate(request) {
                Ok(principal) => {
                    tracing::debug!(
                        username = %principal.username(),
                        provider = provider.name(),
                        "authenticated"
                    );
                    return Ok(principal);
                }
                Err(e) if e.is_upstream() => {
                    upstream_failure.get_or_insert(e);
                }
                Err(_) => {}
            }
        }

        Err(upstream_failure.unwrap_or(SecurityError::AuthenticationFailed))
    }
}

/// Builder for [`AuthenticationManager`].
#[derive(Default)]
pub struct AuthenticationManagerBuilder {
    providers: Vec<Arc<dyn AuthenticationProvider>>,
}

impl AuthenticationManagerBuilder {
    /// Append a provider. Providers are consulted in insertion order.
    pub fn provider(mut self, provider: Arc<dyn AuthenticationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Finish the manager. At least one provider is required.
    pub fn build(self) -> SecurityResult<AuthenticationManager> {
        if self.providers.is_empty() {
            return Err(SecurityError::Configuration(
                "authentication manager requires at least one provider".to_string(),
            ));
        }
        Ok(AuthenticationManager {
            providers: self.providers,
        })
    }
}
