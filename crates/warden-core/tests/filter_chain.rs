//! End-to-end evaluation through the public API: hashed credentials, a file
//! backed identity source and concurrent requests sharing one chain.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;
use warden_core::{
    AuthenticationManager, Decision, DenyReason, DenyStatus, FileIdentityStore, HashedVerifier, HttpMethod, Identity, IdentityStore, InMemoryIdentityStore, InboundRequest,
    PasswordVerifier, PresentedCredential, RequestFilterChain, RuleTable,
    StoreAuthenticationProvider,
};

fn rules() -> RuleTable {
    RuleTable::parse_lines([
        "GET /auth/hello public",
        "GET /auth/hello-secured authority:CREATE",
        "* /** deny",
    ])
    .unwrap()
}

fn chain(store: Arc<dyn IdentityStore>, verifier: Arc<dyn PasswordVerifier>) -> RequestFilterChain {
    let provider = StoreAuthenticationProvider::new(store, verifier).unwrap();
    let manager = AuthenticationManager::builder()
        .provider(Arc::new(provider))
        .build()
        .unwrap();
    RequestFilterChain::new(rules(), manager, Duration::from_secs(2))
}

fn write_identities(file: &NamedTempFile, identities: &[Identity]) {
    let json = serde_json::to_string(identities).unwrap();
    std::fs::write(file.path(), json).unwrap();
}

fn fast_bcrypt() -> Arc<dyn PasswordVerifier> {
    Arc::new(HashedVerifier::bcrypt(4).unwrap())
}

fn secured(username: &str, credential: &str) -> InboundRequest {
    InboundRequest::with_basic(HttpMethod::Get, "/auth/hello-secured", username, credential)
}

#[tokio::test]
async fn test_scenarios_with_hashed_fixture() {
    let verifier = fast_bcrypt();
    let reader = Identity::builder("reader")
        .password("secret", verifier.as_ref())
        .unwrap()
        .authorities(["READ"])
        .build();
    let santiago = Identity::builder("santiago")
        .password("12345", verifier.as_ref())
        .unwrap()
        .authorities(["READ", "CREATE"])
        .build();
    let store = InMemoryIdentityStore::from_identities(vec![santiago, reader]).unwrap();
    let chain = chain(Arc::new(store), verifier);

    // 1: public route, no credential
    assert_eq!(
        chain
            .evaluate(&InboundRequest::anonymous(HttpMethod::Get, "/auth/hello"))
            .await,
        Decision::Allow { principal: None }
    );

    // 2: authority present
    let allowed = chain.evaluate(&secured("santiago", "12345")).await;
    assert!(allowed.is_allowed());
    assert!(allowed.principal().unwrap().has_authority("CREATE"));

    // 3: wrong password
    assert_eq!(
        chain.evaluate(&secured("santiago", "54321")).await.status(),
        Some(DenyStatus::Unauthorized)
    );

    // 4: authority missing
    assert_eq!(
        chain.evaluate(&secured("reader", "secret")).await.status(),
        Some(DenyStatus::Forbidden)
    );

    // 5: unmatched route, even when authenticated
    let unknown = InboundRequest::with_basic(HttpMethod::Post, "/unknown-path", "santiago", "12345");
    assert!(!chain.evaluate(&unknown).await.is_allowed());
}

#[tokio::test]
async fn test_stored_hash_is_not_a_valid_credential() {
    let verifier: Arc<dyn PasswordVerifier> = Arc::new(HashedVerifier::argon2());
    let stored = verifier.encode("12345").unwrap();
    let store = InMemoryIdentityStore::from_identities(vec![Identity::builder("santiago")
        .credential(stored.clone())
        .authorities(["CREATE"])
        .build()])
    .unwrap();
    let chain = chain(Arc::new(store), verifier);

    let decision = chain.evaluate(&secured("santiago", &stored)).await;
    assert_eq!(decision.status(), Some(DenyStatus::Unauthorized));
}

#[tokio::test]
async fn test_file_source_changes_apply_without_restart() {
    let verifier = fast_bcrypt();
    let file = NamedTempFile::new().unwrap();
    write_identities(
        &file,
        &[Identity::builder("santiago")
            .password("12345", verifier.as_ref())
            .unwrap()
            .authorities(["READ"])
            .build()],
    );

    let store = FileIdentityStore::new(file.path());
    let chain = chain(Arc::new(store), verifier.clone());

    assert_eq!(
        chain.evaluate(&secured("santiago", "12345")).await.status(),
        Some(DenyStatus::Forbidden)
    );

    write_identities(
        &file,
        &[Identity::builder("santiago")
            .password("12345", verifier.as_ref())
            .unwrap()
            .authorities(["READ", "CREATE"])
            .build()],
    );

    assert!(chain.evaluate(&secured("santiago", "12345")).await.is_allowed());
}

#[tokio::test]
async fn test_broken_file_source_denies_generically() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();
    file.flush().unwrap();

    let verifier: Arc<dyn PasswordVerifier> = Arc::new(HashedVerifier::default());
    let chain = chain(Arc::new(FileIdentityStore::new(file.path())), verifier);

    assert_eq!(
        chain.evaluate(&secured("santiago", "12345")).await,
        Decision::Deny {
            status: DenyStatus::Unauthorized,
            reason: DenyReason::UpstreamUnavailable,
        }
    );

    // Public routes never touch the identity source.
    assert!(chain
        .evaluate(&InboundRequest::anonymous(HttpMethod::Get, "/auth/hello"))
        .await
        .is_allowed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_chain() {
    let verifier = fast_bcrypt();
    let store = InMemoryIdentityStore::fixture(verifier.as_ref()).unwrap();
    let chain = Arc::new(chain(Arc::new(store), verifier));

    let mut handles = Vec::new();
    for i in 0..32 {
        let chain = chain.clone();
        handles.push(tokio::spawn(async move {
            let request = if i % 2 == 0 {
                secured("santiago", "12345")
            } else {
                InboundRequest::new(
                    HttpMethod::Get,
                    "/auth/hello-secured",
                    PresentedCredential::from_authorization(Some("Bearer token")),
                )
            };
            (i, chain.evaluate(&request).await)
        }));
    }

    for handle in handles {
        let (i, decision) = handle.await.unwrap();
        if i % 2 == 0 {
            assert!(decision.is_allowed(), "request {} should be allowed", i);
        } else {
            assert_eq!(decision.status(), Some(DenyStatus::Unauthorized));
        }
    }
}
