#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use oktavian::config::Config;
use oktavian::store::AppState;

pub const ADMIN_PASSWORD: &str = "testpassword";
pub const USER_PASSWORD: &str = "testpass123";
pub const REGISTRATION_SECRET: &str = "letmein";

/// A unique address per call. Valkey is shared by concurrently running
/// tests, and login rate-limit counters are keyed by email and client.
pub fn unique_email(local: &str) -> String {
    format!("{local}-{}@oktavian.test", Uuid::new_v4().simple())
}

/// Build a test `AppState` from the given pool.
///
/// - Bootstraps the Admin role and an admin user with a unique email
///   (password = "testpassword")
/// - Connects to real Valkey
pub async fn test_state(pool: PgPool) -> AppState {
    let admin_email = unique_email("admin");
    oktavian::store::bootstrap::run(&pool, &admin_email, Some(ADMIN_PASSWORD))
        .await
        .expect("bootstrap failed");

    let valkey_url =
        std::env::var("VALKEY_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
    let valkey = oktavian::store::valkey::connect(&valkey_url)
        .await
        .expect("valkey connection failed");

    let config = Config {
        listen: "127.0.0.1:0".into(),
        database_url: "postgres://localhost/test".into(),
        valkey_url,
        jwt_secret: "integration-test-secret".into(),
        token_ttl_hours: 1,
        registration_secret: Some(REGISTRATION_SECRET.into()),
        reset_token_ttl_secs: 600,
        smtp_host: None,
        smtp_port: 587,
        smtp_from: "test@oktavian.test".into(),
        smtp_username: None,
        smtp_password: None,
        frontend_url: "http://localhost:3000".into(),
        admin_email,
        admin_password: Some(ADMIN_PASSWORD.into()),
        cors_origins: vec![],
        trust_proxy_headers: false,
    };

    AppState::new(pool, valkey, config).expect("app state")
}

/// Build the full API router with the given state.
pub fn test_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .merge(oktavian::api::router(&state))
        .with_state(state)
}

/// Login as the bootstrap admin user. Returns the bearer token.
pub async fn admin_login(app: &Router, state: &AppState) -> String {
    login(app, &state.config.admin_email, ADMIN_PASSWORD).await
}

pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = post_json(
        app,
        "",
        "/api/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed for {email}: {body}");
    body["token"]
        .as_str()
        .expect("login response missing token")
        .to_owned()
}

/// Register a user through the public endpoint. Returns `(user_id, token)`.
pub async fn register(app: &Router, name: &str, email: &str) -> (Uuid, String) {
    let (status, body) = post_json(
        app,
        "",
        "/api/auth/register",
        serde_json::json!({
            "name": name,
            "email": email,
            "password": USER_PASSWORD,
            "secret": REGISTRATION_SECRET,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    let user_id = Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    let token = body["token"].as_str().unwrap().to_owned();
    (user_id, token)
}

/// Create a role via the admin API. Returns the role id.
pub async fn create_role(
    app: &Router,
    admin_token: &str,
    name: &str,
    regular: bool,
    final_review: bool,
    admin: bool,
) -> Uuid {
    let (status, body) = post_json(
        app,
        admin_token,
        "/api/roles",
        serde_json::json!({
            "name": name,
            "permit_regular_review": regular,
            "permit_final_review": final_review,
            "permit_admin": admin,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create role failed: {body}");
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

/// Assign (or clear, with `None`) a user's role.
pub async fn assign_role(app: &Router, admin_token: &str, user_id: Uuid, role_id: Option<Uuid>) {
    let (status, body) = put_json(
        app,
        admin_token,
        "/api/users",
        serde_json::json!({ "id": user_id, "role": role_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "assign role failed: {body}");
}

/// Register a user holding a fresh role with the given flags. Returns
/// `(user_id, token)`.
pub async fn reviewer(
    app: &Router,
    admin_token: &str,
    regular: bool,
    final_review: bool,
) -> (Uuid, String) {
    let email = unique_email("reviewer");
    let (user_id, token) = register(app, "Reviewer", &email).await;
    let role_id = create_role(
        app,
        admin_token,
        &format!("Reviewer {email}"),
        regular,
        final_review,
        false,
    )
    .await;
    assign_role(app, admin_token, user_id, Some(role_id)).await;
    (user_id, token)
}

/// Send a GET request with Bearer auth.
pub async fn get_json(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    send(app, "GET", token, path, None).await
}

/// Send a POST request with Bearer auth and JSON body.
pub async fn post_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", token, path, Some(body)).await
}

/// Send a PUT request with Bearer auth and JSON body.
pub async fn put_json(app: &Router, token: &str, path: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", token, path, Some(body)).await
}

/// Send a DELETE request with Bearer auth.
pub async fn delete_json(app: &Router, token: &str, path: &str) -> (StatusCode, Value) {
    send(app, "DELETE", token, path, None).await
}

async fn send(
    app: &Router,
    method: &str,
    token: &str,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(path);
    if !token.is_empty() {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = body_json(resp).await;
    (status, body)
}

/// Extract JSON body from a response.
async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
