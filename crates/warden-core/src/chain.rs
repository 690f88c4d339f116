//! Per-request filter chain.
//!
//! The chain matches the request against the [`RuleTable`], authenticates
//! when the matched rule needs it, checks authorities and produces a
//! [`Decision`]. Every failure becomes a deny decision; nothing escapes as an
//! error.
//!
//! # Status Mapping
//!
//! | Situation                                   | Status |
//! |---------------------------------------------|--------|
//! | public rule                                 | allow  |
//! | no credential, bad credential, source down  | 401    |
//! | authenticated, authority missing            | 403    |
//! | authenticated, deny-all rule                | 403    |

use std::fmt;
use std::time::Duration;

use super::credential::PresentedCredential;
use super::error::{SecurityError, SecurityResult};
use super::manager::AuthenticationManager;
use super::principal::{AuthenticatedPrincipal, AuthenticationRequest};
use super::rules::{HttpMethod, Requirement, Rule, RuleTable};

/// Default upper bound for one identity lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// The parts of an HTTP request the chain looks at.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Request path, without query string.
    pub path: String,
    /// Credential material from the request headers.
    pub credential: PresentedCredential,
}

impl InboundRequest {
    /// Create a request.
    pub fn new(method: HttpMethod, path: impl Into<String>, credential: PresentedCredential) -> Self {
        Self {
            method,
            path: path.into(),
            credential,
        }
    }

    /// Create a request without credentials.
    pub fn anonymous(method: HttpMethod, path: impl Into<String>) -> Self {
        Self::new(method, path, PresentedCredential::Missing)
    }

    /// Create a request with a Basic credential.
    pub fn with_basic(
        method: HttpMethod,
        path: impl Into<String>,
        username: &str,
        credential: &str,
    ) -> Self {
        Self::new(method, path, PresentedCredential::basic(username, credential))
    }
}

/// Deny status class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyStatus {
    /// Identity not established (401).
    Unauthorized,
    /// Identity established but not permitted (403).
    Forbidden,
}

impl DenyStatus {
    /// HTTP status code.
    pub fn code(&self) -> u16 {
        match self {
            DenyStatus::Unauthorized => 401,
            DenyStatus::Forbidden => 403,
        }
    }
}

/// Why a request was denied. For operators only; callers see the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No credential on a protected route.
    MissingCredential,
    /// Unknown user, wrong credential or malformed header.
    BadCredential,
    /// Identity source unreachable, corrupt or too slow.
    UpstreamUnavailable,
    /// Authenticated without the required authority.
    InsufficientAuthority,
    /// Matched a deny-all rule or no rule.
    DenyAll,
}

impl DenyReason {
    /// Stable identifier for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MissingCredential => "missing_credential",
            DenyReason::BadCredential => "bad_credential",
            DenyReason::UpstreamUnavailable => "upstream_unavailable",
            DenyReason::InsufficientAuthority => "insufficient_authority",
            DenyReason::DenyAll => "deny_all",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward to the handler. `principal` is `None` on public routes.
    Allow {
        principal: Option<AuthenticatedPrincipal>,
    },
    /// Reject.
    Deny {
        status: DenyStatus,
        reason: DenyReason,
    },
}

impl Decision {
    fn unauthorized(reason: DenyReason) -> Self {
        Decision::Deny {
            status: DenyStatus::Unauthorized,
            reason,
        }
    }

    fn forbidden(reason: DenyReason) -> Self {
        Decision::Deny {
            status: DenyStatus::Forbidden,
            reason,
        }
    }

    /// Check if the request may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    /// Deny status, if denied.
    pub fn status(&self) -> Option<DenyStatus> {
        match self {
            Decision::Allow { .. } => None,
            Decision::Deny { status, .. } => Some(*status),
        }
    }

    /// Authenticated principal, if any.
    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        match self {
            Decision::Allow { principal } => principal.as_ref(),
            Decision::Deny { .. } => None,
        }
    }
}

/// Evaluates requests against rules and an authentication manager.
///
/// Holds only immutable state and is shared across concurrent requests
/// behind an `Arc`.
pub struct RequestFilterChain {
    rules: RuleTable,
    manager: AuthenticationManager,
    lookup_timeout: Duration,
}

impl RequestFilterChain {
    /// Create a chain.
    pub fn new(rules: RuleTable, manager: AuthenticationManager, lookup_timeout: Duration) -> Self {
        Self {
            rules,
            manager,
            lookup_timeout,
        }
    }

    /// Configured rules.
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Evaluate a request.
    ///
    /// Authentication may block on the identity source, so it runs on the
    /// blocking pool. Dropping the returned future abandons the evaluation
    /// without a decision; a lookup already in flight finishes in the
    /// background and its result is discarded.
    pub async fn evaluate(&self, request: &InboundRequest) -> Decision {
        let rule = self.rules.match_request(request.method, &request.path);

        if !rule.requirement.requires_authentication() {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                rule = %rule,
                "public route"
            );
            return Decision::Allow { principal: None };
        }

        let attempt = match &request.credential {
            PresentedCredential::Basic(attempt) => attempt.clone(),
            PresentedCredential::Missing => {
                return self.finish(request, rule, Decision::unauthorized(DenyReason::MissingCredential));
            }
            PresentedCredential::Malformed => {
                return self.finish(request, rule, Decision::unauthorized(DenyReason::BadCredential));
            }
        };

        let outcome = self.authenticate(attempt).await;
        let decision = Self::decide(rule, outcome);
        self.finish(request, rule, decision)
    }

    /// Authorization step: map an authentication outcome and the matched
    /// rule to a decision.
    pub fn decide(rule: &Rule, outcome: SecurityResult<AuthenticatedPrincipal>) -> Decision {
        let principal = match outcome {
            Ok(principal) => principal,
            Err(e) if e.is_upstream() => {
                return Decision::unauthorized(DenyReason::UpstreamUnavailable);
            }
            Err(_) => return Decision::unauthorized(DenyReason::BadCredential),
        };

        let permitted = match &rule.requirement {
            Requirement::Public | Requirement::Authenticated => true,
            Requirement::RequiresAuthority(authority) => principal.has_authority(authority),
            Requirement::RequiresAnyAuthority(authorities) => principal.has_any_authority(authorities),
            Requirement::DenyAll => return Decision::forbidden(DenyReason::DenyAll),
        };

        if permitted {
            Decision::Allow {
                principal: Some(principal),
            }
        } else {
            Decision::forbidden(DenyReason::InsufficientAuthority)
        }
    }

    async fn authenticate(&self, attempt: AuthenticationRequest) -> SecurityResult<AuthenticatedPrincipal> {
        let manager = self.manager.clone();
        let lookup = tokio::task::spawn_blocking(move || manager.authenticate(&attempt));

        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                tracing::warn!(error = %join_error, "authentication task failed");
                Err(SecurityError::UpstreamUnavailable(join_error.to_string()))
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "identity lookup timed out"
                );
                Err(SecurityError::UpstreamTimeout(self.lookup_timeout))
            }
        }
    }

    fn finish(&self, request: &InboundRequest, rule: &Rule, decision: Decision) -> Decision {
        match &decision {
            Decision::Allow { principal } => {
                tracing::debug!(
                    method = %request.method,
                    path = %request.path,
                    rule = %rule,
                    username = principal.as_ref().map(|p| p.username()).unwrap_or("-"),
                    "request allowed"
                );
            }
            Decision::Deny { status, reason } => {
                let error = deny_error(rule, *reason);
                tracing::info!(
                    method = %request.method,
                    path = %request.path,
                    rule = %rule,
                    status = status.code(),
                    reason = %reason,
                    error = %error,
                    "request denied"
                );
            }
        }
        decision
    }
}

/// Caller-facing error for a deny. Upstream problems read as a plain
/// authentication failure.
fn deny_error(rule: &Rule, reason: DenyReason) -> SecurityError {
    match (reason, &rule.requirement) {
        (DenyReason::InsufficientAuthority, Requirement::RequiresAuthority(authority)) => {
            SecurityError::AuthorizationDenied {
                authority: authority.clone(),
            }
        }
        (DenyReason::InsufficientAuthority, Requirement::RequiresAnyAuthority(authorities)) => {
            SecurityError::AuthorizationDenied {
                authority: authorities.join("|"),
            }
        }
        (DenyReason::DenyAll, _) => SecurityError::AccessDenied,
        _ => SecurityError::AuthenticationFailed,
    }
}

impl fmt::Debug for RequestFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFilterChain")
            .field("rules", &self.rules.len())
            .field("providers", &self.manager.provider_count())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}
