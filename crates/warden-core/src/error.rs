//! Security-specific error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while authenticating or authorizing a request.
///
/// Only the filter chain turns these into decisions. Callers outside the
/// chain see a deny status, never the variant itself.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Bad or missing credential. Deliberately carries no detail.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Valid identity without the required authority.
    #[error("authority '{authority}' is required")]
    AuthorizationDenied {
        /// The authority the matched rule demanded.
        authority: String,
    },

    /// Request matched a deny-all rule or no rule at all.
    #[error("access denied")]
    AccessDenied,

    /// Username is not known to the identity store.
    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    /// Identity source could not be reached or returned garbage.
    #[error("identity source unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Identity lookup exceeded its time budget.
    #[error("identity lookup timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// Credential material present but unparseable.
    #[error("invalid credential format: {0}")]
    InvalidCredentialFormat(String),

    /// Rule definition could not be parsed or compiled.
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// Raw credential could not be hashed for storage.
    #[error("credential encoding failed: {0}")]
    Encoding(String),

    /// Component wiring is incomplete or inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SecurityError {
    /// Whether this error originates from the identity source being degraded
    /// rather than from the caller's credential.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SecurityError::UpstreamUnavailable(_) | SecurityError::UpstreamTimeout(_)
        )
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
