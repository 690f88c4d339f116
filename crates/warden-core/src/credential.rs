//! Credential material presented with a request.
//!
//! Only HTTP Basic is understood: `Authorization: Basic base64(user:pass)`.
//! Anything else present in the header is treated as malformed and fails
//! authentication the same way a wrong password does.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::error::{SecurityError, SecurityResult};
use super::principal::AuthenticationRequest;

const BASIC_SCHEME: &str = "Basic";

/// What the caller sent, after header parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedCredential {
    /// No credential header at all.
    Missing,
    /// A header was present but could not be decoded.
    Malformed,
    /// Decoded username/credential pair.
    Basic(AuthenticationRequest),
}

impl PresentedCredential {
    /// Interpret an optional `Authorization` header value.
    pub fn from_authorization(header: Option<&str>) -> Self {
        match header {
            None => PresentedCredential::Missing,
            Some(value) => match parse_basic(value) {
                Ok(request) => PresentedCredential::Basic(request),
                Err(e) => {
                    tracing::debug!(error = %e, "unusable authorization header");
                    PresentedCredential::Malformed
                }
            },
        }
    }

    /// Build a Basic credential directly.
    pub fn basic(username: impl Into<String>, credential: impl Into<String>) -> Self {
        PresentedCredential::Basic(AuthenticationRequest::new(username, credential))
    }
}

/// Decode a `Basic` authorization header value.
///
/// The scheme is matched case-insensitively. The username ends at the first
/// `:`; the credential may itself contain colons.
pub fn parse_basic(value: &str) -> SecurityResult<AuthenticationRequest> {
    let value = value.trim();
    let (scheme, encoded) = value
        .split_once(' ')
        .ok_or_else(|| SecurityError::InvalidCredentialFormat("missing scheme".to_string()))?;

    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(SecurityError::InvalidCredentialFormat(format!(
            "unsupported scheme: {}",
            scheme
        )));
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| SecurityError::InvalidCredentialFormat(format!("bad base64: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| SecurityError::InvalidCredentialFormat("not UTF-8".to_string()))?;

    let (username, credential) = decoded
        .split_once(':')
        .ok_or_else(|| SecurityError::InvalidCredentialFormat("missing ':' separator".to_string()))?;

    Ok(AuthenticationRequest::new(username, credential))
}
