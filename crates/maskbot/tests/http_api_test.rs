//! HTTP API tests through the full router
//!
//! Validation and auth paths never reach the database, so they run against a
//! lazily connected pool pointing nowhere. Database-backed cases are ignored
//! by default; run with: DATABASE_URL=... cargo test -p maskbot -- --ignored

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use maskbot::http::{router, AppState};
use maskcore::auth::TokenIssuer;
use maskcore::storage::create_pool;
use maskcore::Database;

const SECRET: &str = "test-secret";

fn tokens() -> TokenIssuer {
    TokenIssuer::new(SecretString::from(SECRET.to_string()))
}

fn app_with(db: Database) -> Router {
    router(Arc::new(AppState::new(db, tokens(), None)))
}

fn offline_app() -> Router {
    let pool = create_pool("postgres://user:pw@127.0.0.1:1/app?sslmode=disable", 1).unwrap();
    app_with(Database::new(pool))
}

async fn database_app() -> Router {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let db = Database::new(create_pool(&url, 2).unwrap());
    db.migrate().await.unwrap();
    app_with(db)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_token(mut request: Request<Body>, token: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
    request
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = offline_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn register_without_telegram_id_is_400() {
    let (status, body) = send(
        offline_app(),
        json_request(Method::POST, "/api/register", json!({"firstName": "Ann"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "telegramId is required");
}

#[tokio::test]
async fn malformed_json_is_400_with_error_body() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn profile_without_telegram_id_is_400() {
    let (status, _) = send(
        offline_app(),
        json_request(Method::POST, "/api/profile", json!({"phone": "+1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_mask_without_mask_id_is_400() {
    let (status, body) = send(
        offline_app(),
        json_request(Method::POST, "/api/user/42/add-mask", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "maskId is required");
}

#[tokio::test]
async fn non_numeric_mask_id_in_path_is_400() {
    let request = Request::builder().uri("/api/masks/abc").body(Body::empty()).unwrap();
    let (status, _) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_require_token() {
    let request = Request::builder().uri("/api/admin/users").body(Body::empty()).unwrap();
    let (status, body) = send(offline_app(), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn admin_routes_reject_foreign_token() {
    let foreign = TokenIssuer::new(SecretString::from("other".to_string()))
        .issue("root")
        .unwrap();
    let request = with_token(
        json_request(Method::POST, "/api/admin/masks", json!({"name": "Gold"})),
        &foreign,
    );
    let (status, _) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_missing_fields_is_400() {
    let (status, body) = send(
        offline_app(),
        json_request(Method::POST, "/api/admin/login", json!({"username": "root"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "password is required");
}

#[tokio::test]
async fn create_mask_without_name_is_400() {
    let token = tokens().issue("root").unwrap();
    let request = with_token(
        json_request(Method::POST, "/api/admin/masks", json!({"price": 100})),
        &token,
    );
    let (status, _) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_message_without_bot_is_503() {
    let token = tokens().issue("root").unwrap();
    let request = with_token(
        json_request(Method::POST, "/api/admin/send-message", json!({"message": "hi"})),
        &token,
    );
    let (status, _) = send(offline_app(), request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn cors_preflight_is_cached_for_a_day() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/masks")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = offline_app().oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "https://app.example.com"
    );
    assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
}

#[tokio::test]
async fn cors_preflight_allows_patch_and_origin_header() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/admin/masks/1")
        .header(header::ORIGIN, "https://admin.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "origin,authorization")
        .body(Body::empty())
        .unwrap();
    let response = offline_app().oneshot(request).await.unwrap();

    let headers = response.headers();
    let methods = headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap().to_str().unwrap();
    assert!(methods.split(',').any(|m| m.trim() == "PATCH"), "{}", methods);
    let allowed = headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap().to_str().unwrap();
    assert!(allowed.split(',').any(|h| h.trim() == "origin"), "{}", allowed);
}

#[tokio::test]
async fn non_numeric_mask_filter_is_400_with_error_body() {
    let token = tokens().issue("root").unwrap();
    for uri in ["/api/admin/features?maskId=abc", "/api/admin/reviews?maskId=abc"] {
        let request = with_token(Request::builder().uri(uri).body(Body::empty()).unwrap(), &token);
        let (status, body) = send(offline_app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{}: {}", uri, body);
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn register_creates_then_returns_existing_user() {
    let telegram_id = format!("it-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let app = database_app().await;

    let (status, created) = send(
        app.clone(),
        json_request(Method::POST, "/api/register", json!({"telegramId": telegram_id, "firstName": "Ann"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["telegramId"], telegram_id.as_str());

    let (status, again) = send(
        app.clone(),
        json_request(Method::POST, "/api/register", json!({"telegramId": telegram_id, "firstName": "Other"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(again["id"], created["id"]);
    assert_eq!(again["firstName"], "Ann");

    let request = Request::builder()
        .uri(format!("/api/user/{}", telegram_id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires database"]
async fn unknown_user_is_404() {
    let request = Request::builder()
        .uri("/api/user/no-such-user/masks")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(database_app().await, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "user not found");
}
