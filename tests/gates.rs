//! End-to-end checks of the HTTP surface over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use async_trait::async_trait;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use recipe_api_auth::{
    AppState, AuthSettings,
    models::api_key::{ApiKey, NewApiKey},
    models::permission::Permission,
    models::user::{NewUser, User},
    router,
    services::api_key_service::hash_api_key,
    services::password::PasswordConfig,
    services::rate_limiter::{RateLimitConfig, RateLimitRule},
    store::{CredentialStore, InMemoryCredentialStore, StoreError},
};

const SECRET: &[u8] = b"integration-test-secret-at-least-32-bytes!";

fn settings(rate_limits: RateLimitConfig) -> AuthSettings {
    AuthSettings {
        token_secret: SECRET.to_vec(),
        token_ttl: Duration::from_secs(3600),
        password: PasswordConfig {
            cost: 1,
            memory_kib: 1024,
        },
        rate_limits,
        trust_forwarded_for: true,
    }
}

fn roomy() -> RateLimitConfig {
    RateLimitConfig::uniform(RateLimitRule::new(60, 1000))
}

struct TestApp {
    app: Router,
    store: Arc<InMemoryCredentialStore>,
}

fn test_app(rate_limits: RateLimitConfig) -> TestApp {
    test_app_with(settings(rate_limits))
}

fn test_app_with(settings: AuthSettings) -> TestApp {
    let store = Arc::new(InMemoryCredentialStore::new());
    let state = AppState::new(store.clone(), settings).unwrap();
    TestApp {
        app: router(state),
        store,
    }
}

/// Delays key lookups so concurrent requests overlap inside the gate.
struct SlowKeyLookups(InMemoryCredentialStore);

#[async_trait]
impl CredentialStore for SlowKeyLookups {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.0.find_user_by_email(email).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.0.create_user(user).await
    }

    async fn find_api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.find_api_key_by_hash(key_hash).await
    }

    async fn find_api_key_by_id(&self, id: Uuid) -> Result<Option<ApiKey>, StoreError> {
        self.0.find_api_key_by_id(id).await
    }

    async fn create_api_key(&self, key: NewApiKey) -> Result<ApiKey, StoreError> {
        self.0.create_api_key(key).await
    }

    async fn delete_api_key(&self, id: Uuid) -> Result<bool, StoreError> {
        self.0.delete_api_key(id).await
    }

    async fn list_api_keys_by_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, StoreError> {
        self.0.list_api_keys_by_user(user_id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.0.ping().await
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, retry_after, body)
}

fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.1");
    if let Some(credential) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {credential}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "198.51.100.1");
    if let Some(credential) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {credential}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn signup(app: &Router, email: &str) -> StatusCode {
    let body = json!({ "name": "Ada", "email": email, "password": "correct-horse" });
    send(app, json_request("POST", "/api/v1/auth/signup", None, body))
        .await
        .0
}

async fn login(app: &Router, email: &str) -> String {
    let body = json!({ "email": email, "password": "correct-horse" });
    let (status, _, body) = send(app, json_request("POST", "/api/v1/auth/login", None, body)).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

async fn session_for(app: &Router, email: &str) -> String {
    assert_eq!(signup(app, email).await, StatusCode::CREATED);
    login(app, email).await
}

async fn create_key(app: &Router, session: &str, permissions: Value) -> Value {
    let body = json!({ "name": "ci", "permissions": permissions });
    let (status, _, body) =
        send(app, json_request("POST", "/api/v1/api-keys", Some(session), body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn test_health() {
    let t = test_app(roomy());
    let (status, _, body) = send(&t.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["credential_store"], "reachable");
}

#[tokio::test]
async fn test_signup_rejects_duplicate_email_case_insensitively() {
    let t = test_app(roomy());
    assert_eq!(signup(&t.app, "Ada@Example.com").await, StatusCode::CREATED);

    let body = json!({ "name": "Other", "email": "ada@example.COM", "password": "another-pass" });
    let (status, _, body) =
        send(&t.app, json_request("POST", "/api/v1/auth/signup", None, body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "email_taken");
}

#[tokio::test]
async fn test_signup_validation() {
    let t = test_app(roomy());
    let body = json!({ "name": "Ada", "email": "not-an-email", "password": "correct-horse" });
    let (status, _, body) =
        send(&t.app, json_request("POST", "/api/v1/auth/signup", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn test_login_failures_share_one_message() {
    let t = test_app(roomy());
    signup(&t.app, "ada@example.com").await;

    let wrong = json!({ "email": "ada@example.com", "password": "wrong-password" });
    let (status, _, wrong) =
        send(&t.app, json_request("POST", "/api/v1/auth/login", None, wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let unknown = json!({ "email": "nobody@example.com", "password": "correct-horse" });
    let (status, _, unknown) =
        send(&t.app, json_request("POST", "/api/v1/auth/login", None, unknown)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn test_login_grants_full_permission_set() {
    let t = test_app(roomy());
    signup(&t.app, "ada@example.com").await;

    let body = json!({ "email": "ADA@example.com", "password": "correct-horse" });
    let (status, _, body) = send(&t.app, json_request("POST", "/api/v1/auth/login", None, body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(
        body["permissions"].as_array().unwrap().len(),
        Permission::ALL.len()
    );
}

#[tokio::test]
async fn test_session_gate_rejects_missing_and_invalid_tokens() {
    let t = test_app(roomy());

    let (status, _, body) = send(&t.app, get("/api/v1/api-keys", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "missing_credential");

    let (status, _, body) = send(&t.app, get("/api/v1/api-keys", Some("not.a-token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_credential");
}

#[tokio::test]
async fn test_api_key_authenticates_resource_routes() {
    let t = test_app(roomy());
    let session = session_for(&t.app, "ada@example.com").await;

    let created = create_key(&t.app, &session, json!(["read:recipe"])).await;
    let key = created["key"].as_str().unwrap();
    assert!(key.starts_with("rk_"));

    let (status, _, body) = send(&t.app, get("/api/v1/identity", Some(key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_key_id"], created["id"]);
    assert_eq!(body["permissions"], json!(["read:recipe"]));

    // Listing never shows the plaintext again
    let (status, _, body) = send(&t.app, get("/api/v1/api-keys", Some(&session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0].get("key").is_none());

    // A session token is not an API key
    let (status, _, _) = send(&t.app, get("/api/v1/identity", Some(&session))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_key_rejects_unknown_permission() {
    let t = test_app(roomy());
    let session = session_for(&t.app, "ada@example.com").await;

    let body = json!({ "permissions": ["read:recipe", "launch:rocket"] });
    let (status, _, body) =
        send(&t.app, json_request("POST", "/api/v1/api-keys", Some(&session), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("launch:rocket"));
}

#[tokio::test]
async fn test_inactive_and_unknown_keys_are_rejected() {
    let t = test_app(roomy());
    assert_eq!(signup(&t.app, "ada@example.com").await, StatusCode::CREATED);
    let user_id = t
        .store
        .find_user_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;

    let plaintext = "rk_inactiveinactiveinactiveinactiveinactiv";
    t.store
        .create_api_key(NewApiKey {
            user_id,
            key_hash: hash_api_key(plaintext),
            key_prefix: plaintext[..8].to_string(),
            name: None,
            is_active: false,
            permissions: [Permission::ReadRecipe].into_iter().collect(),
        })
        .await
        .unwrap();

    let (status, _, body) = send(&t.app, get("/api/v1/identity", Some(plaintext))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "inactive_credential");

    let (status, _, body) = send(&t.app, get("/api/v1/identity", Some("rk_unknown"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "invalid_credential");
}

#[tokio::test]
async fn test_revocation_ownership() {
    let t = test_app(roomy());
    let ada = session_for(&t.app, "ada@example.com").await;
    let bob = session_for(&t.app, "bob@example.com").await;

    let created = create_key(&t.app, &ada, json!(["read:recipe"])).await;
    let key = created["key"].as_str().unwrap();

    let (status, _, _) = send(
        &t.app,
        json_request("DELETE", "/api/v1/api-keys", Some(&bob), json!({ "key": key })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(
        &t.app,
        json_request(
            "DELETE",
            "/api/v1/api-keys",
            Some(&ada),
            json!({ "key": "rk_doesnotexist" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &t.app,
        json_request("DELETE", "/api/v1/api-keys", Some(&ada), json!({ "key": key })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = send(&t.app, get("/api/v1/identity", Some(key))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoke_by_id() {
    let t = test_app(roomy());
    let session = session_for(&t.app, "ada@example.com").await;
    let created = create_key(&t.app, &session, json!([])).await;
    let uri = format!("/api/v1/api-keys/{}", created["id"].as_str().unwrap());

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {session}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {session}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_routes_are_throttled_with_retry_after() {
    let limits = RateLimitConfig {
        auth: RateLimitRule::new(60, 3),
        ..roomy()
    };
    let t = test_app(limits);

    for i in 0..3 {
        let email = format!("user{i}@example.com");
        assert_eq!(signup(&t.app, &email).await, StatusCode::CREATED);
    }

    let body = json!({ "name": "Late", "email": "late@example.com", "password": "correct-horse" });
    let (status, retry_after, body) =
        send(&t.app, json_request("POST", "/api/v1/auth/signup", None, body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "rate_limited");
    let retry_after: u64 = retry_after.unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));

    // Other classes keep their own budget
    let (status, _, _) = send(&t.app, get("/api/v1/api-keys", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_bad_credentials_lock_the_client_out() {
    let limits = RateLimitConfig {
        credential_failures: RateLimitRule::new(300, 3),
        ..roomy()
    };
    let t = test_app(limits);

    for _ in 0..3 {
        let (status, _, _) = send(&t.app, get("/api/v1/identity", Some("rk_guess"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, retry_after, _) = send(&t.app, get("/api/v1/identity", Some("rk_guess"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(retry_after.is_some());
}

#[tokio::test]
async fn test_session_failures_lock_out_the_api_key_gate() {
    let limits = RateLimitConfig {
        credential_failures: RateLimitRule::new(300, 2),
        ..roomy()
    };
    let t = test_app(limits);

    for token in ["forged.session.token", "another.forged.token"] {
        let (status, _, _) = send(&t.app, get("/api/v1/api-keys", Some(token))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Same client, other gate: the budget is shared
    let (status, retry_after, body) = send(&t.app, get("/api/v1/identity", Some("rk_any"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "rate_limited");
    assert!(retry_after.is_some());

    let (status, _, _) = send(&t.app, get("/api/v1/api-keys", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_good_credentials_do_not_spend_the_failure_budget() {
    let limits = RateLimitConfig {
        credential_failures: RateLimitRule::new(300, 2),
        ..roomy()
    };
    let t = test_app(limits);
    let session = session_for(&t.app, "ada@example.com").await;

    for _ in 0..10 {
        let (status, _, _) = send(&t.app, get("/api/v1/api-keys", Some(&session))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, _) = send(&t.app, get("/api/v1/api-keys", Some("bad.session.token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_and_tampered_tokens_are_indistinguishable() {
    let t = test_app_with(AuthSettings {
        token_ttl: Duration::ZERO,
        ..settings(roomy())
    });
    let expired = session_for(&t.app, "ada@example.com").await;

    let (status, _, expired_body) = send(&t.app, get("/api/v1/api-keys", Some(&expired))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(expired_body["error"]["code"], "invalid_credential");

    let mut parts: Vec<String> = expired.split('.').map(str::to_string).collect();
    parts[1] = parts[1].chars().rev().collect();
    let tampered = parts.join(".");

    let (status, _, tampered_body) = send(&t.app, get("/api/v1/api-keys", Some(&tampered))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(tampered_body, expired_body);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_guesses_cannot_outrun_the_lockout() {
    let limits = RateLimitConfig {
        credential_failures: RateLimitRule::new(300, 3),
        ..roomy()
    };
    let store = Arc::new(SlowKeyLookups(InMemoryCredentialStore::new()));
    let app = router(AppState::new(store, settings(limits)).unwrap());

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let key = format!("rk_guess{i}");
                send(&app, get("/api/v1/identity", Some(&key))).await.0
            })
        })
        .collect();

    let mut evaluated = 0;
    let mut throttled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::UNAUTHORIZED => evaluated += 1,
            StatusCode::TOO_MANY_REQUESTS => throttled += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(evaluated, 3);
    assert_eq!(throttled, 97);
}
