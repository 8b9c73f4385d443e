mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;

use common::*;
use landwatch::config::Environment;

fn demo_config() -> landwatch::config::Config {
    let mut cfg = test_config();
    cfg.demo.allow_demo = true;
    cfg.demo.email = Some(USER_EMAIL.to_string());
    cfg.demo.password = Some(USER_PASSWORD.to_string());
    cfg
}

fn demo_app(cfg: landwatch::config::Config, backend: Arc<FakeBackend>) -> axum::Router {
    app_with(cfg, backend, Arc::new(ScriptedGenerator::failing()))
}

#[tokio::test]
async fn protected_routes_require_a_user() {
    let app = app(Arc::new(backend_with_user()));

    let resp = send(&app, get_request("/api/notifications", None)).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json()["error"]["code"], "UNAUTHORIZED");

    let resp = send(&app, get_request("/api/notifications", Some("stale-token"))).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = send(&app, get_request("/api/notifications", Some(USER_TOKEN))).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["data"], json!([]));
}

#[tokio::test]
async fn login_sets_session_cookies_usable_by_later_requests() {
    let backend = Arc::new(backend_with_user());
    let app = app(backend.clone());

    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": USER_EMAIL, "password": USER_PASSWORD}),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["user"]["id"], USER_ID);
    let names = resp.set_cookie_names();
    assert!(names.contains(&"sb-access-token".to_string()));
    assert!(names.contains(&"sb-refresh-token".to_string()));
    let raw = resp
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));
    // Private cookies are encrypted.
    assert!(!raw.contains(USER_TOKEN));

    let cookies = resp.cookie_header();
    let req = Request::builder()
        .uri("/api/notifications")
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, req).await.status, StatusCode::OK);
}

#[tokio::test]
async fn bad_login_is_a_client_error() {
    let app = app(Arc::new(backend_with_user()));
    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": USER_EMAIL, "password": "nope"}),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["error"]["message"], "Invalid login credentials");
}

#[tokio::test]
async fn page_requests_refresh_sessions_and_api_requests_do_not() {
    let backend = Arc::new(backend_with_user());
    let app = app(backend.clone());

    let login = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": USER_EMAIL, "password": USER_PASSWORD}),
        ),
    )
    .await;
    let cookies = login.cookie_header();

    let api = Request::builder()
        .uri("/api/health")
        .header(header::COOKIE, cookies.clone())
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, api).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(backend.refreshes(), 0);

    // The fake access token is not a JWT, so it reads as expired.
    let page = Request::builder()
        .uri("/")
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, page).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(backend.refreshes(), 1);
    assert!(resp.set_cookie_names().contains(&"sb-refresh-token".to_string()));
}

#[tokio::test]
async fn logout_clears_cookies() {
    let app = app(Arc::new(backend_with_user()));
    let login = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": USER_EMAIL, "password": USER_PASSWORD}),
        ),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::COOKIE, login.cookie_header())
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, req).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["ok"], true);
    let names = resp.set_cookie_names();
    assert!(names.contains(&"sb-access-token".to_string()));
    assert!(names.contains(&"sb-refresh-token".to_string()));
    let cleared = resp
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .all(|v| v.contains("Max-Age=0"));
    assert!(cleared);
}

#[tokio::test]
async fn demo_sign_in_gates() {
    let backend = Arc::new(backend_with_user());

    let app = demo_app(test_config(), backend.clone());
    let resp = send(&app, json_request("POST", "/api/auth/demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let app = demo_app(demo_config(), Arc::new(backend_with_user().without_admin()));
    let resp = send(&app, json_request("POST", "/api/auth/demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json()["error"]["code"], "NOT_CONFIGURED");

    let mut no_creds = demo_config();
    no_creds.demo.password = None;
    let app = demo_app(no_creds, backend.clone());
    let resp = send(&app, json_request("POST", "/api/auth/demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);

    let mut wrong = demo_config();
    wrong.demo.password = Some("wrong".to_string());
    let app = demo_app(wrong, backend.clone());
    let resp = send(&app, json_request("POST", "/api/auth/demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.json()["error"]["message"], "Invalid login credentials");

    let app = demo_app(demo_config(), backend);
    let resp = send(&app, json_request("POST", "/api/auth/demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.set_cookie_names().contains(&"sb-access-token".to_string()));
}

#[tokio::test]
async fn development_environment_allows_demo() {
    let mut cfg = demo_config();
    cfg.demo.allow_demo = false;
    cfg.basic.environment = Environment::Development;
    let app = demo_app(cfg, Arc::new(backend_with_user()));
    let resp = send(&app, json_request("POST", "/api/auth/demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn create_demo_provisions_once() {
    let backend = Arc::new(FakeBackend::new());
    let mut cfg = demo_config();
    cfg.demo.allow_auto_confirm = true;
    let app = demo_app(cfg, backend.clone());

    let resp = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/auth/create-demo")
            .body(Body::from("not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({"ok": true}));

    let profiles = backend.rows("profiles");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["role"], "viewer");
    assert_eq!(profiles[0]["full_name"], "Demo User");
    assert_eq!(profiles[0]["organization"], "Demo Organization");
    assert_eq!(backend.confirmed().len(), 1);

    let resp = send(&app, json_request("POST", "/api/auth/create-demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["message"], "Demo account already exists");
}

#[tokio::test]
async fn create_demo_reuses_registered_user() {
    // Auth user exists but no profile row yet.
    let backend = Arc::new(backend_with_user());
    let app = demo_app(demo_config(), backend.clone());

    let resp = send(&app, json_request("POST", "/api/auth/create-demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::OK);
    let profiles = backend.rows("profiles");
    assert_eq!(profiles[0]["id"], USER_ID);
    // Auto-confirm is off in production unless enabled.
    assert!(backend.confirmed().is_empty());
}

#[tokio::test]
async fn create_demo_admin_rejection_is_a_server_error() {
    let backend = Arc::new(FakeBackend::new().failing_admin_create());
    let app = demo_app(demo_config(), backend.clone());

    let resp = send(&app, json_request("POST", "/api/auth/create-demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json()["error"]["code"], "INTERNAL_ERROR");
    assert!(backend.rows("profiles").is_empty());
}

#[tokio::test]
async fn create_demo_needs_credentials() {
    let mut cfg = demo_config();
    cfg.demo.email = None;
    let app = demo_app(cfg, Arc::new(FakeBackend::new()));
    let resp = send(&app, json_request("POST", "/api/auth/create-demo", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/auth/create-demo",
            None,
            json!({"email": "field@example.org", "password": "pw-123456"}),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn confirm_user_flow() {
    let backend = Arc::new(
        backend_with_user().with_rows("profiles", vec![json!({"id": USER_ID, "email": USER_EMAIL})]),
    );
    let app = demo_app(demo_config(), backend.clone());

    let resp = send(&app, json_request("POST", "/api/auth/confirm-user", None, json!({}))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        json_request(
            "POST",
            "/api/auth/confirm-user",
            None,
            json!({"email": "ghost@example.org"}),
        ),
    )
    .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        json_request("POST", "/api/auth/confirm-user", None, json!({"email": USER_EMAIL})),
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(backend.confirmed(), vec![USER_ID.to_string()]);
}

#[tokio::test]
async fn confirm_user_gates_and_failures() {
    let profiles = vec![json!({"id": USER_ID, "email": USER_EMAIL})];
    let body = json!({"email": USER_EMAIL});

    let app = demo_app(
        demo_config(),
        Arc::new(backend_with_user().without_admin()),
    );
    let resp = send(&app, json_request("POST", "/api/auth/confirm-user", None, body.clone())).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);

    let app = demo_app(
        test_config(),
        Arc::new(backend_with_user().with_rows("profiles", profiles.clone())),
    );
    let resp = send(&app, json_request("POST", "/api/auth/confirm-user", None, body.clone())).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let app = demo_app(
        demo_config(),
        Arc::new(
            backend_with_user()
                .failing_confirm()
                .with_rows("profiles", profiles),
        ),
    );
    // The admin endpoint answers 403; callers still see a server error.
    let resp = send(&app, json_request("POST", "/api/auth/confirm-user", None, body)).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json()["error"]["code"], "INTERNAL_ERROR");
}
