mod common;

use axum::http::{header, Method, Request, StatusCode};
use bookshelf::service::{BAD_CREDENTIALS, DUPLICATE_USERNAME};
use bookshelf::Store;
use common::TestApp;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn registration_creates_member_profile_and_logs_in() {
    let app = TestApp::new();
    let (id, token) = app.register("newbie").await;

    let profile = app.store.profile(id).await.unwrap().unwrap();
    assert_eq!(profile.role, bookshelf::model::Role::Member);

    let res = app.get("/profile", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["username"], "newbie");
    assert_eq!(res.data()["email"], "newbie@example.com");
    assert_eq!(res.data()["role"], "Member");
    assert!(res.data().get("password_hash").is_none());
}

#[tokio::test]
async fn register_sets_session_cookie() {
    let app = TestApp::new();
    let res = app
        .post(
            "/register",
            None,
            json!({"username": "cookie", "email": "c@example.com", "password1": "biscuits-99", "password2": "biscuits-99"}),
        )
        .await;
    let cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("sessionid="));

    let pair = cookie.split(';').next().unwrap().to_string();
    let req = Request::builder()
        .method(Method::GET)
        .uri("/profile")
        .header(header::COOKIE, pair)
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_username_fails_without_second_profile() {
    let app = TestApp::new();
    app.register("taken").await;
    let res = app
        .post(
            "/register",
            None,
            json!({"username": "taken", "email": "t2@example.com", "password1": "another-pass", "password2": "another-pass"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.field_errors("username"), vec![DUPLICATE_USERNAME]);
    assert!(app.store.user_by_id(2).await.unwrap().is_none());
    assert!(app.store.profile(2).await.unwrap().is_none());
}

#[tokio::test]
async fn registration_validation() {
    let app = TestApp::new();
    let res = app
        .post(
            "/register",
            None,
            json!({"username": "bad name!", "email": "", "password1": "short", "password2": "short"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.field_errors("username").is_empty());
    assert_eq!(res.field_errors("email"), vec!["This field is required."]);
    assert!(res.field_errors("password2")[0].contains("too short"));
}

#[tokio::test]
async fn login_and_logout() {
    let app = TestApp::new();
    app.register("walker").await;

    let res = app.post("/login", None, json!({"username": "walker", "password": "wrong-pass"})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.field_errors("__all__"), vec![BAD_CREDENTIALS]);

    let res = app.post("/login", None, json!({"username": "walker", "password": "correct-horse"})).await;
    assert_eq!(res.status, StatusCode::OK);
    let token = res.data()["token"].as_str().unwrap().to_string();
    assert_eq!(app.get("/profile", Some(&token)).await.status, StatusCode::OK);

    let res = app.request(Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert!(res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap().contains("Max-Age=0"));
    assert_eq!(app.get("/profile", Some(&token)).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_username_fails_like_a_wrong_password() {
    let app = TestApp::new();
    let res = app.post("/login", None, json!({"username": "nobody", "password": "correct-horse"})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.field_errors("__all__"), vec![BAD_CREDENTIALS]);
}

#[tokio::test]
async fn out_of_range_session_ttl_fails_cleanly() {
    let app = TestApp::with_settings(bookshelf::Settings {
        session_ttl_hours: 3_000_000_000_000,
        ..common::test_settings()
    });
    let res = app
        .post(
            "/register",
            None,
            json!({"username": "late", "email": "late@example.com", "password1": "correct-horse", "password2": "correct-horse"}),
        )
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn login_clears_expired_sessions() {
    let app = TestApp::new();
    let (id, _) = app.register("sweeper").await;
    app.store
        .create_session(bookshelf::model::Session {
            token: "stale".into(),
            user_id: id,
            expires_at: chrono::Utc::now() - chrono::Duration::hours(1),
        })
        .await
        .unwrap();
    let res = app.post("/login", None, json!({"username": "sweeper", "password": "correct-horse"})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(!app.store.delete_session("stale").await.unwrap());
}

#[tokio::test]
async fn unknown_token_is_anonymous() {
    let app = TestApp::new();
    assert_eq!(app.get("/profile", Some("not-a-session")).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/api/books", Some("not-a-session")).await.status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_applies_present_fields() {
    let app = TestApp::new();
    let (_, token) = app.register("jane").await;
    let res = app.post("/profile", Some(&token), json!({"first_name": "Jane", "last_name": "Austen"})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["first_name"], "Jane");
    assert_eq!(res.data()["email"], "jane@example.com");

    let res = app.post("/profile", Some(&token), json!({"email": "not-an-email"})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app.post("/profile", None, json!({"first_name": "Anon"})).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_and_ready() {
    let app = TestApp::new();
    let res = app.get("/health", None).await;
    assert_eq!(res.body, json!({"status": "ok"}));
    let res = app.get("/ready", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["store"], "ok");
    let res = app.get("/version", None).await;
    assert_eq!(res.body["name"], "bookshelf");
}
