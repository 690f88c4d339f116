//! Password verification.
//!
//! A [`PasswordVerifier`] checks a presented credential against its stored
//! representation. Two implementations exist:
//!
//! - [`PlaintextVerifier`]: stored value is the raw password. Insecure, for tests
//!   and local fixtures only.
//! - [`HashedVerifier`]: stored value is an Argon2id PHC string
//!   (`$argon2id$v=19$...`) or a bcrypt hash (`$2b$10$...`).
//!
//! Verification never fails loudly: any mismatch or malformed stored value
//! yields `false`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier as _, SaltString},
    Argon2,
};
use subtle::ConstantTimeEq;

use super::error::{SecurityError, SecurityResult};

/// bcrypt work factor used when none is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;

/// Validates presented credentials against stored ones.
pub trait PasswordVerifier: Send + Sync {
    /// Check `presented` against the stored representation.
    fn verify(&self, presented: &str, stored: &str) -> bool;

    /// Produce the stored representation of a raw credential.
    fn encode(&self, raw: &str) -> SecurityResult<String>;

    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;
}

/// Constant-time string comparison.
///
/// Length differences still return early, but only after a dummy comparison
/// so the branch costs the same.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        let _ = b.ct_eq(b);
        return false;
    }
    a.ct_eq(b).into()
}

/// Compares credentials verbatim.
///
/// **WARNING**: stores passwords in the clear. Never use outside tests or
/// throwaway fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextVerifier;

impl PasswordVerifier for PlaintextVerifier {
    fn verify(&self, presented: &str, stored: &str) -> bool {
        constant_time_eq(presented.as_bytes(), stored.as_bytes())
    }

    fn encode(&self, raw: &str) -> SecurityResult<String> {
        Ok(raw.to_string())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Password hashing algorithm behind a [`HashedVerifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// Argon2id, PHC string format.
    Argon2,
    /// bcrypt, modular crypt format.
    Bcrypt,
}

impl HashAlgorithm {
    /// Configuration name.
    pub fn tag(&self) -> &'static str {
        match self {
            HashAlgorithm::Argon2 => "argon2",
            HashAlgorithm::Bcrypt => "bcrypt",
        }
    }

    /// Detect the algorithm from a stored hash prefix.
    pub fn detect(stored: &str) -> Option<Self> {
        if stored.starts_with("$argon2") {
            Some(HashAlgorithm::Argon2)
        } else if stored.starts_with("$2") {
            Some(HashAlgorithm::Bcrypt)
        } else {
            None
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone)]
enum HashScheme {
    Argon2(Argon2<'static>),
    Bcrypt { cost: u32 },
}

/// Verifies salted, deliberately slow password hashes.
///
/// Only hashes of the configured algorithm verify; a bcrypt hash presented to
/// an Argon2 verifier is rejected.
#[derive(Clone)]
pub struct HashedVerifier {
    scheme: HashScheme,
}

impl HashedVerifier {
    /// Argon2id with the library's default parameters.
    pub fn argon2() -> Self {
        Self {
            scheme: HashScheme::Argon2(Argon2::default()),
        }
    }

    /// bcrypt with the given work factor (4 to 31).
    pub fn bcrypt(cost: u32) -> SecurityResult<Self> {
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&cost) {
            return Err(SecurityError::Configuration(format!(
                "bcrypt cost must be between {} and {}, got {}",
                BCRYPT_MIN_COST, BCRYPT_MAX_COST, cost
            )));
        }
        Ok(Self {
            scheme: HashScheme::Bcrypt { cost },
        })
    }

    fn algorithm(&self) -> HashAlgorithm {
        match self.scheme {
            HashScheme::Argon2(_) => HashAlgorithm::Argon2,
            HashScheme::Bcrypt { .. } => HashAlgorithm::Bcrypt,
        }
    }
}

impl Default for HashedVerifier {
    fn default() -> Self {
        Self::argon2()
    }
}

impl fmt::Debug for HashedVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("HashedVerifier");
        s.field("algorithm", &self.algorithm());
        if let HashScheme::Bcrypt { cost } = self.scheme {
            s.field("cost", &cost);
        }
        s.finish()
    }
}

impl PasswordVerifier for HashedVerifier {
    fn verify(&self, presented: &str, stored: &str) -> bool {
        let expected = self.algorithm();
        match HashAlgorithm::detect(stored) {
            Some(found) if found == expected => {}
            found => {
                tracing::debug!(
                    expected = %expected,
                    found = ?found,
                    "stored credential is not a hash of the configured algorithm"
                );
                return false;
            }
        }

        match &self.scheme {
            HashScheme::Argon2(argon2) => match PasswordHash::new(stored) {
                Ok(parsed) => argon2.verify_password(presented.as_bytes(), &parsed).is_ok(),
                Err(e) => {
                    tracing::debug!(error = %e, "stored credential rejected");
                    false
                }
            },
            HashScheme::Bcrypt { .. } => bcrypt::verify(presented, stored).unwrap_or_else(|e| {
                tracing::debug!(error = %e, "stored credential rejected");
                false
            }),
        }
    }

    fn encode(&self, raw: &str) -> SecurityResult<String> {
        match &self.scheme {
            HashScheme::Argon2(argon2) => {
                let salt = SaltString::generate(&mut OsRng);
                argon2
                    .hash_password(raw.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| SecurityError::Encoding(e.to_string()))
            }
            HashScheme::Bcrypt { cost } => {
                bcrypt::hash(raw, *cost).map_err(|e| SecurityError::Encoding(e.to_string()))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.algorithm().tag()
    }
}

/// Configured credential verification algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordEncoding {
    /// Plaintext comparison.
    #[default]
    None,
    /// Argon2id.
    Argon2,
    /// bcrypt at [`DEFAULT_BCRYPT_COST`].
    Bcrypt,
}

impl PasswordEncoding {
    /// Build the verifier for this setting.
    pub fn build(&self) -> Arc<dyn PasswordVerifier> {
        match self {
            PasswordEncoding::None => Arc::new(PlaintextVerifier),
            PasswordEncoding::Argon2 => Arc::new(HashedVerifier::argon2()),
            PasswordEncoding::Bcrypt => Arc::new(HashedVerifier {
                scheme: HashScheme::Bcrypt {
                    cost: DEFAULT_BCRYPT_COST,
                },
            }),
        }
    }

    /// Whether stored credentials are hashed.
    pub fn is_hashed(&self) -> bool {
        !matches!(self, PasswordEncoding::None)
    }
}

impl fmt::Display for PasswordEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordEncoding::None => f.write_str("none"),
            PasswordEncoding::Argon2 => f.write_str("argon2"),
            PasswordEncoding::Bcrypt => f.write_str("bcrypt"),
        }
    }
}

impl FromStr for PasswordEncoding {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "noop" | "plaintext" => Ok(PasswordEncoding::None),
            "argon2" | "argon2id" => Ok(PasswordEncoding::Argon2),
            "bcrypt" => Ok(PasswordEncoding::Bcrypt),
            other => Err(SecurityError::Configuration(format!(
                "unknown password encoder: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_bcrypt() -> HashedVerifier {
        HashedVerifier::bcrypt(4).unwrap()
    }

    #[test]
    fn test_plaintext_verify() {
        let verifier = PlaintextVerifier;
        assert!(verifier.verify("12345", "12345"));
        assert!(!verifier.verify("1234", "12345"));
        assert!(!verifier.verify("", "12345"));
        assert_eq!(verifier.encode("12345").unwrap(), "12345");
    }

    #[test]
    fn test_argon2_round_trip() {
        let verifier = HashedVerifier::argon2();
        let stored = verifier.encode("12345").unwrap();

        assert!(stored.starts_with("$argon2id$"));
        assert!(verifier.verify("12345", &stored));
        assert!(!verifier.verify("54321", &stored));
    }

    #[test]
    fn test_bcrypt_round_trip() {
        let verifier = fast_bcrypt();
        let stored = verifier.encode("correct horse").unwrap();

        assert!(stored.starts_with("$2b$04$"));
        assert!(verifier.verify("correct horse", &stored));
        assert!(!verifier.verify("correct horse ", &stored));
    }

    #[test]
    fn test_bcrypt_cost_read_from_hash() {
        let stored = fast_bcrypt().encode("12345").unwrap();
        // Verification reads the cost from the hash, not the verifier.
        let verifier = HashedVerifier::bcrypt(DEFAULT_BCRYPT_COST).unwrap();
        assert!(verifier.verify("12345", &stored));
        assert_eq!(HashAlgorithm::detect(&stored), Some(HashAlgorithm::Bcrypt));
    }

    #[test]
    fn test_encode_is_salted() {
        let verifier = HashedVerifier::default();
        let first = verifier.encode("secret").unwrap();
        let second = verifier.encode("secret").unwrap();

        assert_ne!(first, second);
        assert!(verifier.verify("secret", &first));
        assert!(verifier.verify("secret", &second));
    }

    #[test]
    fn test_malformed_stored_value_is_rejected() {
        let verifier = HashedVerifier::default();
        assert!(!verifier.verify("12345", "12345"));
        assert!(!verifier.verify("12345", "$argon2id$garbage"));
        assert!(!verifier.verify("12345", ""));
        assert!(!fast_bcrypt().verify("12345", "$2b$04$short"));
    }

    #[test]
    fn test_algorithm_mismatch_is_rejected() {
        let stored = fast_bcrypt().encode("pw").unwrap();
        assert!(!HashedVerifier::argon2().verify("pw", &stored));

        let stored = HashedVerifier::argon2().encode("pw").unwrap();
        assert!(!fast_bcrypt().verify("pw", &stored));
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        assert!(HashedVerifier::bcrypt(3).is_err());
        assert!(HashedVerifier::bcrypt(32).is_err());
        assert!(HashedVerifier::bcrypt(BCRYPT_MIN_COST).is_ok());
    }

    #[test]
    fn test_password_encoding_parse() {
        assert_eq!("none".parse::<PasswordEncoding>().unwrap(), PasswordEncoding::None);
        assert_eq!("Argon2id".parse::<PasswordEncoding>().unwrap(), PasswordEncoding::Argon2);
        assert_eq!("bcrypt".parse::<PasswordEncoding>().unwrap(), PasswordEncoding::Bcrypt);
        assert!("sha256".parse::<PasswordEncoding>().is_err());
    }

    #[test]
    fn test_password_encoding_build() {
        assert_eq!(PasswordEncoding::None.build().name(), "none");
        assert_eq!(PasswordEncoding::Argon2.build().name(), "argon2");
        assert_eq!(PasswordEncoding::Bcrypt.build().name(), "bcrypt");
        assert!(PasswordEncoding::Bcrypt.is_hashed());
        assert!(!PasswordEncoding::None.is_hashed());
    }
}
