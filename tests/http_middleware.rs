//! Middleware stack behavior over a real axum router.

use axum::{http::StatusCode, routing::get, Router};
use gatekit::auth::{JwtAuth, MemoryStore};
use gatekit::config::{AuthConfig, StoreBackend};
use gatekit::schema::{MenuActionResource, RoleMenu, Superuser, UserRole};
use gatekit::{AuthLayer, CurrentUser, EnforceLayer, PolicyEngine, PolicySnapshot};
use std::sync::Arc;
use tower::ServiceExt;

fn jwt() -> Arc<JwtAuth> {
    let config = AuthConfig {
        signing_key: "middleware-test-key".to_string(),
        signing_method: "HS256".to_string(),
        expired_secs: 3600,
        store: StoreBackend::Memory,
    };
    Arc::new(JwtAuth::new(&config, Arc::new(MemoryStore::new())).unwrap())
}

fn engine_allowing_alice() -> Arc<PolicyEngine> {
    let engine = PolicyEngine::new(Superuser {
        user_name: "root".into(),
        password: String::new(),
        real_name: "Administrator".into(),
    });
    let grants = vec![RoleMenu {
        id: "g1".into(),
        role_id: "operator".into(),
        menu_id: "menu-users".into(),
        action_id: "act-query".into(),
    }];
    let resources = vec![MenuActionResource {
        id: "r1".into(),
        action_id: "act-query".into(),
        method: "GET".into(),
        path: "/api/v1/users".into(),
    }];
    let bindings = vec![UserRole {
        id: "b1".into(),
        user_id: "alice".into(),
        role_id: "operator".into(),
    }];
    engine.swap(PolicySnapshot::build(&grants, &resources, &bindings));
    Arc::new(engine)
}

fn app(auth: Arc<JwtAuth>, engine: Arc<PolicyEngine>) -> Router {
    async fn handler(user: CurrentUser) -> String {
        format!("hello {}", user.id())
    }
    async fn health() -> &'static str {
        "ok"
    }

    // Enforcement only wraps the protected routes; authentication wraps
    // everything but skips the health prefix.
    let protected = Router::new()
        .route("/api/v1/users", get(handler))
        .layer(EnforceLayer::new(engine));

    Router::new()
        .merge(protected)
        .route("/health", get(health))
        .layer(AuthLayer::new(auth).skip_prefixes(vec!["/health".to_string()]))
}

fn request(path: &str, token: Option<&str>) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(axum::body::Body::empty()).unwrap()
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = app(jwt(), engine_allowing_alice());
    let response = app.oneshot(request("/api/v1/users", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn skip_prefix_bypasses_authentication() {
    let app = app(jwt(), engine_allowing_alice());
    let response = app.oneshot(request("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn granted_subject_passes_both_layers() {
    let auth = jwt();
    let app = app(auth.clone(), engine_allowing_alice());

    let token = auth.generate_token("alice").await.unwrap();
    let response = app
        .oneshot(request("/api/v1/users", Some(&token.access_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn authenticated_but_ungranted_subject_is_forbidden() {
    let auth = jwt();
    let app = app(auth.clone(), engine_allowing_alice());

    let token = auth.generate_token("mallory").await.unwrap();
    let response = app
        .oneshot(request("/api/v1/users", Some(&token.access_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn revoked_token_is_rejected_at_the_auth_layer() {
    let auth = jwt();
    let app = app(auth.clone(), engine_allowing_alice());

    let token = auth.generate_token("alice").await.unwrap();
    auth.destroy_token(&token.access_token).await.unwrap();

    let response = app
        .oneshot(request("/api/v1/users", Some(&token.access_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
