//! Integration tests for the authenticated client's 401 handling.
//!
//! Asserts: exactly one refresh and one retry per expired request, no
//! second refresh after a retried 401, single-flight refresh across
//! concurrent requests, error-message extraction, and cancellation.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use context_relay::client::ApiClient;
use context_relay::config::{ApiConfig, Config, CredentialsConfig, RetrievalConfig};
use context_relay::credentials::CredentialStore;
use context_relay::error::ApiError;
use context_relay::models::TokenPair;

fn test_config(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: None,
        },
        credentials: CredentialsConfig::default(),
        retrieval: RetrievalConfig::default(),
    }
}

fn seeded_store(dir: &TempDir) -> Arc<CredentialStore> {
    let store = CredentialStore::open(dir.path().join("credentials.json"));
    store.store(TokenPair {
        access_token: "stale-token".to_string(),
        refresh_token: "stale-refresh".to_string(),
        token_type: "bearer".to_string(),
    });
    Arc::new(store)
}

fn empty_store(dir: &TempDir) -> Arc<CredentialStore> {
    Arc::new(CredentialStore::open(dir.path().join("credentials.json")))
}

fn build_client(server: &MockServer, store: Arc<CredentialStore>) -> ApiClient {
    ApiClient::new(&test_config(&server.uri()), store, CancellationToken::new()).unwrap()
}

fn user_body() -> serde_json::Value {
    json!({
        "id": "u1",
        "email": "ada@example.com",
        "name": "Ada",
        "api_key": null,
        "created_at": "2026-01-05T10:00:00Z"
    })
}

fn fresh_pair_body() -> serde_json::Value {
    json!({
        "access_token": "fresh-token",
        "refresh_token": "fresh-refresh",
        "token_type": "bearer"
    })
}

#[tokio::test]
async fn test_single_401_refreshes_once_and_retries_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({"refresh_token": "stale-refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(fresh_pair_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, store.clone());
    let user = client.current_user().await.unwrap();
    assert_eq!(user.email, "ada@example.com");

    // The retried response's token pair is now the cached one.
    assert_eq!(store.access_token().as_deref(), Some("fresh-token"));
    assert_eq!(store.refresh_token().as_deref(), Some("fresh-refresh"));
}

#[tokio::test]
async fn test_second_401_fails_without_another_refresh() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    // The profile endpoint rejects both the original and the retried
    // request; the refresh endpoint must still be hit exactly once.
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token revoked"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fresh_pair_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, store);
    let err = client.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_failed_refresh_clears_credentials() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid refresh token"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, store.clone());
    let err = client.current_user().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!store.has_credentials());
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})),
        )
        .expect(1..=4)
        .mount(&server)
        .await;

    // The delay widens the window in which the other callers pile up
    // behind the refresh gate.
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fresh_pair_body())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1..=4)
        .mount(&server)
        .await;

    let client = Arc::new(build_client(&server, store));
    let (a, b, c, d) = tokio::join!(
        client.current_user(),
        client.current_user(),
        client.current_user(),
        client.current_user(),
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
    // Mock expectations verify on drop: at most one refresh hit the wire.
}

#[tokio::test]
async fn test_unauthenticated_401_is_not_refreshed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = empty_store(&dir);

    // A rejected login has no credential to refresh; the backend's
    // reason passes straight through.
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Incorrect email or password"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server, store);
    let err = client.login("ada@example.com", "wrong-password").await.unwrap_err();

    match err {
        ApiError::Unauthorized { message } => {
            assert_eq!(message, "Incorrect email or password")
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn test_backend_error_message_extracted_from_detail() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/api/v1/projects/p1"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"detail": "Access denied to this project"})),
        )
        .mount(&server)
        .await;

    let client = build_client(&server, store);
    let err = client.get_project("p1").await.unwrap_err();

    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Access denied to this project");
        }
        other => panic!("expected Backend, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_body())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let client =
        ApiClient::new(&test_config(&server.uri()), store, cancel.clone()).unwrap();

    let trigger = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = client.current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Cancelled), "{:?}", err);
    trigger.await.unwrap();
}
