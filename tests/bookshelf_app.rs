mod common;

use axum::http::{Method, StatusCode};
use bookshelf::model::Permission;
use common::{ids, TestApp};
use serde_json::json;

#[tokio::test]
async fn listing_requires_view_permission() {
    let app = TestApp::new();
    app.seed_classics().await;
    let (_, plain) = app.register("plain").await;
    let (_, viewer) = app.register_with_perms("viewer", &[Permission::ShelfView, Permission::ShelfEdit]).await;

    assert_eq!(app.get("/bookshelf/books", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/bookshelf/books", Some(&plain)).await.status, StatusCode::FORBIDDEN);

    let res = app.get("/bookshelf/books", Some(&viewer)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["meta"]["count"], 3);
    assert_eq!(res.body["meta"]["can_create"], false);
    assert_eq!(res.body["meta"]["can_edit"], true);
    assert_eq!(res.body["meta"]["can_delete"], false);
}

#[tokio::test]
async fn superuser_sees_everything() {
    let app = TestApp::new();
    let settings = bookshelf::Settings {
        admin_username: Some("root".into()),
        admin_password: Some("root-pass-123".into()),
        ..common::test_settings()
    };
    bookshelf::AccountService::bootstrap_admin(app.store.as_ref(), &settings).await.unwrap();
    let res = app.post("/login", None, json!({"username": "root", "password": "root-pass-123"})).await;
    let token = res.data()["token"].as_str().unwrap().to_string();

    let res = app.get("/bookshelf/books", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["meta"]["can_delete"], true);
}

#[tokio::test]
async fn create_edit_delete_with_matching_permissions() {
    let app = TestApp::new();
    let author = app.author("Tolkien").await;
    let (_, creator) = app.register_with_perms("creator", &[Permission::ShelfCreate]).await;
    let (_, editor) = app.register_with_perms("editor", &[Permission::ShelfEdit, Permission::ShelfDelete]).await;

    let body = json!({"title": "The Hobbit", "author": author, "publication_year": 1937});
    assert_eq!(app.post("/bookshelf/books", Some(&editor), body.clone()).await.status, StatusCode::FORBIDDEN);
    let res = app.post("/bookshelf/books", Some(&creator), body).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.data()["id"].as_i64().unwrap();

    let edit = json!({"title": "The Hobbit, or There and Back Again", "author": author, "publication_year": 1937});
    let uri = format!("/bookshelf/books/{}/edit", id);
    assert_eq!(app.post(&uri, Some(&creator), edit.clone()).await.status, StatusCode::FORBIDDEN);
    let res = app.post(&uri, Some(&editor), edit).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], "The Hobbit, or There and Back Again");

    let uri = format!("/bookshelf/books/{}/delete", id);
    assert_eq!(app.request(Method::POST, &uri, Some(&creator), None).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.request(Method::POST, &uri, Some(&editor), None).await.status, StatusCode::NO_CONTENT);
    assert_eq!(app.request(Method::POST, &uri, Some(&editor), None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shelf_form_enforces_year_bounds() {
    let app = TestApp::new();
    let author = app.author("Homer").await;
    let (_, creator) = app.register_with_perms("creator", &[Permission::ShelfCreate]).await;
    let res = app
        .post("/bookshelf/books", Some(&creator), json!({"title": "Odyssey", "author": author, "publication_year": 800}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.field_errors("publication_year"),
        vec!["Ensure this value is greater than or equal to 1000."]
    );
}

#[tokio::test]
async fn search_by_title_or_author() {
    let app = TestApp::new();
    let (_, _, [pride, farm, nineteen]) = app.seed_classics().await;
    let (_, viewer) = app.register_with_perms("viewer", &[Permission::ShelfView]).await;

    let res = app.get("/bookshelf/search?q=orwell", Some(&viewer)).await;
    assert_eq!(ids(res.data()), vec![farm, nineteen]);
    assert_eq!(res.body["meta"]["search_query"], "orwell");

    let res = app.get("/bookshelf/search?q=PRIDE", Some(&viewer)).await;
    assert_eq!(ids(res.data()), vec![pride]);

    let res = app.get("/bookshelf/search?q=", Some(&viewer)).await;
    assert_eq!(res.body["meta"]["count"], 0);
}

#[tokio::test]
async fn feedback_is_validated() {
    let app = TestApp::new();
    let (_, plain) = app.register("plain").await;
    let (_, creator) = app.register_with_perms("creator", &[Permission::ShelfCreate]).await;
    let body = json!({"user_feedback": "Lovely shelf", "rating": 4});

    assert_eq!(app.post("/bookshelf/feedback", Some(&plain), body.clone()).await.status, StatusCode::FORBIDDEN);
    let res = app.post("/bookshelf/feedback", Some(&creator), body).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["rating"], 4);

    let res = app.post("/bookshelf/feedback", Some(&creator), json!({"user_feedback": "x".repeat(501), "rating": 0})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.field_errors("user_feedback").is_empty());
    assert!(!res.field_errors("rating").is_empty());
}
