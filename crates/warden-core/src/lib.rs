//! Warden Core - request-time authentication and authorization.
//!
//! This crate decides, per incoming request, whether a caller is identified
//! and permitted to invoke the target endpoint. No session state is kept:
//! every request carries its own credential material and is evaluated on its
//! own.
//!
//! # Pipeline
//!
//! ```text
//! InboundRequest -> RuleTable -> (Public? allow)
//!                              -> AuthenticationManager -> AuthenticationProvider
//!                                                         -> IdentityStore + PasswordVerifier
//!                              -> authority check -> Decision
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_core::{
//!     AuthenticationManager, HttpMethod, Identity, InMemoryIdentityStore, InboundRequest,
//!     PlaintextVerifier, RequestFilterChain, RuleTable, StoreAuthenticationProvider,
//! };
//!
//! let verifier = Arc::new(PlaintextVerifier);
//! let store = InMemoryIdentityStore::from_identities(vec![Identity::builder("santiago")
//!     .credential("12345")
//!     .authorities(["READ", "CREATE"])
//!     .build()])?;
//! let provider = StoreAuthenticationProvider::new(Arc::new(store), verifier)?;
//! let manager = AuthenticationManager::builder().provider(Arc::new(provider)).build()?;
//! let rules = RuleTable::builder()
//!     .request(HttpMethod::Get, "/auth/hello").permit_all()
//!     .request(HttpMethod::Get, "/auth/hello-secured").has_authority("CREATE")
//!     .any_request().deny_all()
//!     .build()?;
//! let chain = RequestFilterChain::new(rules, manager, Duration::from_secs(2));
//!
//! let decision = chain.evaluate(&InboundRequest::anonymous(HttpMethod::Get, "/auth/hello")).await;
//! assert!(decision.is_allowed());
//! ```

pub mod chain;
pub mod credential;
pub mod error;
pub mod identity;
pub mod manager;
pub mod password;
pub mod principal;
pub mod provider;
pub mod rules;

// Error types
pub use error::{SecurityError, SecurityResult};

// Credential handling
pub use credential::PresentedCredential;
pub use password::{HashAlgorithm, HashedVerifier, PasswordEncoding, PasswordVerifier, PlaintextVerifier};

// Identity types
pub use identity::{AuthoritySet, FileIdentityStore, Identity, IdentityBuilder, IdentityStore, InMemoryIdentityStore};
pub use principal::{AuthenticatedPrincipal, AuthenticationRequest};

// Authentication
pub use manager::{AuthenticationManager, AuthenticationManagerBuilder};
pub use provider::{AuthenticationProvider, StoreAuthenticationProvider};

// Authorization
pub use chain::{Decision, DenyReason, DenyStatus, InboundRequest, RequestFilterChain};
pub use rules::{HttpMethod, MethodMatcher, PathPattern, Requirement, Rule, RuleTable, RuleTableBuilder};
