//! End-to-end token lifecycle against the in-memory store.

use gatekit::auth::{JwtAuth, MemoryStore, TokenStore};
use gatekit::config::{AuthConfig, StoreBackend};
use gatekit::ErrorCode;
use std::sync::Arc;
use std::time::Duration;

fn config() -> AuthConfig {
    AuthConfig {
        signing_key: "integration-test-key".to_string(),
        signing_method: "HS512".to_string(),
        expired_secs: 3600,
        store: StoreBackend::Memory,
    }
}

#[tokio::test]
async fn issue_parse_revoke_cycle() {
    let auth = JwtAuth::new(&config(), Arc::new(MemoryStore::new())).unwrap();

    let token = auth.generate_token("alice").await.unwrap();
    assert_eq!(token.token_type, "Bearer");

    let subject = auth.parse_user_id(&token.access_token).await.unwrap();
    assert_eq!(subject, "alice");

    auth.destroy_token(&token.access_token).await.unwrap();
    let err = auth.parse_user_id(&token.access_token).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidToken);
}

#[tokio::test]
async fn concurrent_sessions_are_independent() {
    let auth = Arc::new(JwtAuth::new(&config(), Arc::new(MemoryStore::new())).unwrap());

    let alice = auth.generate_token("alice").await.unwrap();
    let bob = auth.generate_token("bob").await.unwrap();

    // Revoking one session leaves the other live.
    auth.destroy_token(&alice.access_token).await.unwrap();
    assert!(auth.parse_user_id(&alice.access_token).await.is_err());
    assert_eq!(auth.parse_user_id(&bob.access_token).await.unwrap(), "bob");
}

#[tokio::test]
async fn store_expiry_invalidates_before_jwt_expiry() {
    // The JWT itself is still within its validity window, but the store
    // entry has lapsed. The store verdict wins.
    let store = Arc::new(MemoryStore::new());
    let auth = JwtAuth::new(&config(), store.clone()).unwrap();

    let token = auth.generate_token("alice").await.unwrap();
    store
        .set(&token.access_token, Duration::from_millis(10))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let err = auth.parse_user_id(&token.access_token).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidToken);
}

#[tokio::test]
async fn release_closes_the_store() {
    let auth = JwtAuth::new(&config(), Arc::new(MemoryStore::new())).unwrap();
    let token = auth.generate_token("alice").await.unwrap();

    auth.release().await.unwrap();

    let err = auth.parse_user_id(&token.access_token).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidToken);
}
