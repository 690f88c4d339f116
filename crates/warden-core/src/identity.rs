//! Identities and the stores that hold them.
//!
//! The [`IdentityStore`] trait is the seam between the pipeline and wherever
//! identities actually live. Two stores ship with the crate:
//!
//! - [`InMemoryIdentityStore`]: fixture identities provisioned at startup.
//! - [`FileIdentityStore`]: an external JSON file re-read on every lookup.
//!
//! # Fixture Format
//!
//! ```text
//! WARDEN_USERS="santiago:12345:READ,CREATE;ana:secret:READ"
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{SecurityError, SecurityResult};
use super::password::PasswordVerifier;

/// Username of the built-in fixture identity.
pub const FIXTURE_USERNAME: &str = "santiago";

/// Raw credential of the built-in fixture identity.
pub const FIXTURE_CREDENTIAL: &str = "12345";

/// Authorities of the built-in fixture identity.
pub const FIXTURE_AUTHORITIES: [&str; 2] = ["READ", "CREATE"];

/// Case-sensitive set of authority tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthoritySet(BTreeSet<String>);

impl AuthoritySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check for an exact authority token.
    pub fn contains(&self, authority: &str) -> bool {
        self.0.contains(authority)
    }

    /// Iterate over the authorities in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of authorities.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no authority is granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for AuthoritySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A known identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    username: String,
    credential: String,
    #[serde(default)]
    authorities: AuthoritySet,
}

impl Identity {
    /// Start building an identity.
    pub fn builder(username: impl Into<String>) -> IdentityBuilder {
        IdentityBuilder {
            username: username.into(),
            credential: String::new(),
            authorities: AuthoritySet::new(),
        }
    }

    /// Unique username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Stored credential representation.
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Granted authorities.
    pub fn authorities(&self) -> &AuthoritySet {
        &self.authorities
    }
}

/// Builder for [`Identity`].
#[derive(Debug, Clone)]
pub struct IdentityBuilder {
    username: String,
    credential: String,
    authorities: AuthoritySet,
}

impl IdentityBuilder {
    /// Set the stored credential (already encoded).
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = credential.into();
        self
    }

    /// Encode a raw credential with the given verifier and store the result.
    pub fn password(mut self, raw: &str, verifier: &dyn PasswordVerifier) -> SecurityResult<Self> {
        self.credential = verifier.encode(raw)?;
        Ok(self)
    }

    /// Set granted authorities.
    pub fn authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().collect();
        self
    }

    /// Finish the identity.
    pub fn build(self) -> Identity {
        Identity {
            username: self.username,
            credential: self.credential,
            authorities: self.authorities,
        }
    }
}

/// Lookup of identities by username.
pub trait IdentityStore: Send + Sync {
    /// Find an identity.
    ///
    /// Returns `IdentityNotFound` when the username is unknown and
    /// `UpstreamUnavailable` when the backing source cannot answer.
    fn find_by_username(&self, username: &str) -> SecurityResult<Identity>;

    /// Short name of the backing source, for logs.
    fn source_name(&self) -> &'static str;
}

fn index_identities(identities: Vec<Identity>) -> SecurityResult<HashMap<String, Identity>> {
    let mut index = HashMap::with_capacity(identities.len());
    for identity in identities {
        if identity.username.is_empty() {
            return Err(SecurityError::Configuration(
                "identity with empty username".to_string(),
            ));
        }
        if index.contains_key(&identity.username) {
            return Err(SecurityError::Configuration(format!(
                "duplicate username: {}",
                identity.username
            )));
        }
        index.insert(identity.username.clone(), identity);
    }
    Ok(index)
}

/// Identity store backed by an in-memory map.
///
/// Read-only after construction, so it is shared across requests without
/// locking.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityStore {
    identities: HashMap<String, Identity>,
}

impl InMemoryIdentityStore {
    /// Provision a store from a list of identities. Usernames must be unique.
    pub fn from_identities(identities: Vec<Identity>) -> SecurityResult<Self> {
        Ok(Self {
            identities: index_identities(identities)?,
        })
    }

    /// The built-in fixture: a single `santiago` identity holding READ and CREATE.
    pub fn fixture(verifier: &dyn PasswordVerifier) -> SecurityResult<Self> {
        let identity = Identity::builder(FIXTURE_USERNAME)
            .password(FIXTURE_CREDENTIAL, verifier)?
            .authorities(FIXTURE_AUTHORITIES)
            .build();
        Self::from_identities(vec![identity])
    }

    /// Parse fixture identities.
    ///
    /// Format: `user:credential:AUTH1,AUTH2;user2:credential:AUTH3`. Raw
    /// credentials are encoded with `verifier`. The credential may itself contain
    /// `:` since the username ends at the first colon and the authority list
    /// starts after the last one.
    pub fn from_user_list(list: &str, verifier: &dyn PasswordVerifier) -> SecurityResult<Self> {
        let mut identities = Vec::new();

        for entry in list.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let (username, rest) = entry.split_once(':').ok_or_else(|| {
                SecurityError::Configuration(format!(
                    "identity entry '{}' must be user:credential:authorities",
                    entry
                ))
            })?;
            let (credential, authorities) = rest.rsplit_once(':').ok_or_else(|| {
                SecurityError::Configuration(format!(
                    "identity entry for '{}' is missing the authority list",
                    username.trim()
                ))
            })?;

            let authorities: Vec<&str> = authorities
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();

            identities.push(
                Identity::builder(username.trim())
                    .password(credential, verifier)?
                    .authorities(authorities)
                    .build(),
            );
        }

        Self::from_identities(identities)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

}

impl IdentityStore for InMemoryIdentityStore {
    fn find_by_username(&self, username: &str) -> SecurityResult<Identity> {
        self.identities
            .get(username)
            .cloned()
            .ok_or_else(|| SecurityError::IdentityNotFound(username.to_string()))
    }

    fn source_name(&self) -> &'static str {
        "memory"
    }
}

/// Identity store backed by a JSON file outside the process.
///
/// The file holds an array of identities:
///
/// ```json
/// [
///   { "username": "santiago", "credential": "$argon2id$v=19$m=19456,t=2,p=1$...", "authorities": ["READ", "CREATE"] }
/// ]
/// ```
///
/// Every lookup re-reads the file, so edits take effect without a restart and
/// each lookup is blocking I/O. Run it off the async executor.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    /// Create a store reading from `path`. The file is not touched until the
    /// first lookup.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> SecurityResult<HashMap<String, Identity>> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            SecurityError::UpstreamUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let identities: Vec<Identity> = serde_json::from_str(&contents).map_err(|e| {
            SecurityError::UpstreamUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        index_identities(identities)
            .map_err(|e| SecurityError::UpstreamUnavailable(e.to_string()))
    }
}

impl IdentityStore for FileIdentityStore {
    fn find_by_username(&self, username: &str) -> SecurityResult<Identity> {
        self.load()?
            .remove(username)
            .ok_or_else(|| SecurityError::IdentityNotFound(username.to_string()))
    }

    fn source_name(&self) -> &'static str {
        "file"
    }
}
