//! Application assembly.
//!
//! Builds the security components from configuration in dependency order:
//! verifier, identity store, provider, manager, rules, chain. Every
//! misconfiguration is reported here, before the listener is bound.

use std::sync::Arc;

use warden_core::{
    AuthenticationManager, FileIdentityStore, IdentityStore, InMemoryIdentityStore, PasswordVerifier,
    RequestFilterChain, RuleTable, SecurityError, SecurityResult, StoreAuthenticationProvider,
};

use crate::config::{GatewayConfig, IdentitySource};
use crate::AppState;

/// Build the identity store selected by `config`.
pub fn build_identity_store(
    config: &GatewayConfig,
    verifier: &dyn PasswordVerifier,
) -> SecurityResult<Arc<dyn IdentityStore>> {
    match config.identity_source {
        IdentitySource::Fixture => {
            let store = match &config.users {
                Some(users) => InMemoryIdentityStore::from_user_list(users, verifier)?,
                None => InMemoryIdentityStore::fixture(verifier)?,
            };
            if store.is_empty() {
                return Err(SecurityError::Configuration(
                    "fixture identity source has no identities".to_string(),
                ));
            }
            tracing::info!(identities = store.len(), "using fixture identities");
            Ok(Arc::new(store))
        }
        IdentitySource::File => {
            let path = config.identity_file.as_ref().ok_or_else(|| {
                SecurityError::Configuration(
                    "identity source 'file' requires --identity-file".to_string(),
                )
            })?;
            if !path.is_file() {
                return Err(SecurityError::Configuration(format!(
                    "identity file not found: {}",
                    path.display()
                )));
            }
            tracing::info!(path = %path.display(), "using file identity source");
            Ok(Arc::new(FileIdentityStore::new(path)))
        }
    }
}

/// Build the filter chain from `config`.
pub fn build_chain(config: &GatewayConfig) -> SecurityResult<RequestFilterChain> {
    let verifier = config.password_encoding.build();
    if !config.password_encoding.is_hashed() {
        tracing::warn!("credentials are stored and compared in plaintext");
    }

    let store = build_identity_store(config, verifier.as_ref())?;
    let provider = StoreAuthenticationProvider::new(store, verifier)?;
    let manager = AuthenticationManager::builder()
        .provider(Arc::new(provider))
        .build()?;

    let rules = RuleTable::parse_lines(&config.rules)?;
    for (position, rule) in rules.rules().iter().enumerate() {
        tracing::debug!(position, rule = %rule, "access rule");
    }
    if !rules.has_explicit_catch_all() {
        tracing::info!("no catch-all rule configured, unmatched requests are denied");
    }

    Ok(RequestFilterChain::new(rules, manager, config.lookup_timeout))
}

/// Build the shared application state.
pub fn build_state(config: &GatewayConfig) -> SecurityResult<AppState> {
    let chain = build_chain(config)?;
    tracing::info!(
        rules = chain.rules().len(),
        encoder = %config.password_encoding,
        lookup_timeout_ms = config.lookup_timeout.as_millis() as u64,
        "security filter chain ready"
    );
    Ok(AppState::new(chain, config.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::PasswordEncoding;

    #[test]
    fn test_default_config_assembles() {
        let state = build_state(&GatewayConfig::default()).unwrap();
        assert_eq!(state.chain.rules().len(), 3);
        assert!(state.chain.rules().has_explicit_catch_all());
    }

    #[test]
    fn test_bad_rule_fails_at_startup() {
        let config = GatewayConfig::default().with_rules(["GET /auth/hello maybe"]);
        assert!(matches!(build_chain(&config), Err(SecurityError::InvalidRule(_))));
    }

    #[test]
    fn test_file_source_requires_path() {
        let mut config = GatewayConfig::default();
        config.identity_source = IdentitySource::File;
        assert!(matches!(build_chain(&config), Err(SecurityError::Configuration(_))));

        let config = GatewayConfig::default().with_identity_file("/nonexistent/warden/users.json");
        assert!(matches!(build_chain(&config), Err(SecurityError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_fixture_users_rejected() {
        let config = GatewayConfig::default().with_users("a:1:READ;a:2:READ");
        assert!(matches!(build_chain(&config), Err(SecurityError::Configuration(_))));
    }

    #[test]
    fn test_fixture_encoded_with_configured_verifier() {
        let verifier = PasswordEncoding::Argon2.build();
        let config = GatewayConfig::default().with_password_encoding(PasswordEncoding::Argon2);
        let store = build_identity_store(&config, verifier.as_ref()).unwrap();

        let identity = store.find_by_username("santiago").unwrap();
        assert!(identity.credential().starts_with("$argon2id$"));
        assert!(verifier.verify("12345", identity.credential()));
    }
}
