//! Authentication attempts and their successful outcome.

use std::fmt;

use super::identity::AuthoritySet;

/// A single login/challenge attempt.
///
/// Custom `Debug` redacts the credential to keep it out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    /// Claimed username.
    pub username: String,
    /// Credential as presented by the caller.
    pub credential: String,
}

impl AuthenticationRequest {
    /// Create a new authentication request.
    pub fn new(username: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            credential: credential.into(),
        }
    }
}

impl fmt::Debug for AuthenticationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationRequest")
            .field("username", &self.username)
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

/// Identity attached to a request after successful authentication.
///
/// Scoped to one request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal {
    username: String,
    authorities: AuthoritySet,
}

impl AuthenticatedPrincipal {
    /// Create a principal.
    pub fn new(username: impl Into<String>, authorities: AuthoritySet) -> Self {
        Self {
            username: username.into(),
            authorities,
        }
    }

    /// The authenticated username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Granted authorities.
    pub fn authorities(&self) -> &AuthoritySet {
        &self.authorities
    }

    /// Check for an exact, case-sensitive authority.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Check whether any of the given authorities is granted.
    pub fn has_any_authority<S: AsRef<str>>(&self, authorities: &[S]) -> bool {
        authorities.iter().any(|a| self.has_authority(a.as_ref()))
    }
}
