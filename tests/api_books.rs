mod common;

use axum::http::StatusCode;
use chrono::Datelike;
use common::{ids, TestApp};
use serde_json::json;

#[tokio::test]
async fn list_defaults_to_id_order() {
    let app = TestApp::new();
    let (_, _, [pride, farm, nineteen]) = app.seed_classics().await;
    let res = app.get("/api/books", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(res.data()), vec![pride, farm, nineteen]);
    assert_eq!(res.body["meta"]["count"], 3);
    assert_eq!(res.data()[0]["author_name"], "Jane Austen");
}

#[tokio::test]
async fn filter_by_publication_year() {
    let app = TestApp::new();
    let (_, _, [_, farm, _]) = app.seed_classics().await;
    let res = app.get("/api/books?publication_year=1945", None).await;
    assert_eq!(ids(res.data()), vec![farm]);
}

#[tokio::test]
async fn non_numeric_year_filter_is_a_validation_error() {
    let app = TestApp::new();
    let res = app.get("/api/books?publication_year=soon", None).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(!res.field_errors("publication_year").is_empty());
}

#[tokio::test]
async fn search_matches_author_name() {
    let app = TestApp::new();
    let (_, _, [_, farm, nineteen]) = app.seed_classics().await;
    let res = app.get("/api/books?search=Orwell", None).await;
    assert_eq!(ids(res.data()), vec![farm, nineteen]);
    let res = app.get("/api/books?q=orwell", None).await;
    assert_eq!(ids(res.data()), vec![farm, nineteen]);
}

#[tokio::test]
async fn search_terms_must_all_match() {
    let app = TestApp::new();
    let (_, _, [_, farm, _]) = app.seed_classics().await;
    let res = app.get("/api/books?search=orwell%20farm", None).await;
    assert_eq!(ids(res.data()), vec![farm]);
}

#[tokio::test]
async fn ordering_descending_year() {
    let app = TestApp::new();
    let (_, _, [pride, farm, nineteen]) = app.seed_classics().await;
    let res = app.get("/api/books?ordering=-publication_year", None).await;
    assert_eq!(ids(res.data()), vec![nineteen, farm, pride]);
    let res = app.get("/api/books?ordering=title", None).await;
    assert_eq!(ids(res.data()), vec![farm, nineteen, pride]);
}

#[tokio::test]
async fn list_returns_every_book_without_pagination() {
    let app = TestApp::new();
    let author = app.author("Prolific").await;
    for i in 0..120 {
        app.book(&format!("Volume {i}"), 1900 + i, author).await;
    }
    let res = app.get("/api/books", None).await;
    assert_eq!(res.data().as_array().unwrap().len(), 120);
    assert_eq!(res.body["meta"]["count"], 120);

    let res = app.get("/api/books?limit=10&offset=115", None).await;
    assert_eq!(res.data().as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn anonymous_writes_are_rejected_and_change_nothing() {
    let app = TestApp::new();
    let (_, orwell, [pride, ..]) = app.seed_classics().await;
    let before = app.book_count().await;

    let res = app
        .post("/api/books", None, json!({"title": "Homage to Catalonia", "publication_year": 1938, "author": orwell}))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers.get("www-authenticate").unwrap(), "Bearer");

    let res = app
        .put(&format!("/api/books/{}", pride), None, json!({"title": "X", "publication_year": 1900, "author": orwell}))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app.delete(&format!("/api/books/{}", pride), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.book_count().await, before);
    let res = app.get(&format!("/api/books/{}", pride), None).await;
    assert_eq!(res.data()["title"], "Pride and Prejudice");
}

#[tokio::test]
async fn future_year_fails_validation() {
    let app = TestApp::new();
    let (_, token) = app.register("writer").await;
    let author = app.author("Someone").await;
    let next_year = chrono::Utc::now().year() + 1;
    let res = app
        .post("/api/books", Some(&token), json!({"title": "Tomorrow", "publication_year": next_year, "author": author}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.field_errors("publication_year"),
        vec![format!(
            "Publication year cannot be in the future. Current year is {}.",
            next_year - 1
        )]
    );
    assert_eq!(app.book_count().await, 0);
}

#[tokio::test]
async fn create_update_patch_delete() {
    let app = TestApp::new();
    let (_, token) = app.register("editor").await;
    let author = app.author("Mary Shelley").await;

    let res = app
        .post("/api/books", Some(&token), json!({"title": "Frankenstein", "publication_year": 1818, "author": author}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.data()["id"].as_i64().unwrap();
    assert_eq!(res.data()["author"], author);

    let res = app
        .put(&format!("/api/books/{}", id), Some(&token), json!({"title": "The Last Man", "publication_year": 1826, "author": author}))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], "The Last Man");

    let res = app.patch(&format!("/api/books/{}", id), Some(&token), json!({"publication_year": 1827})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], "The Last Man");
    assert_eq!(res.data()["publication_year"], 1827);

    let res = app.delete(&format!("/api/books/{}", id), Some(&token)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&format!("/api/books/{}", id), None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_author_is_a_field_error() {
    let app = TestApp::new();
    let (_, token) = app.register("editor").await;
    let res = app
        .post("/api/books", Some(&token), json!({"title": "Orphan", "publication_year": 2000, "author": 999}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.field_errors("author"), vec!["Invalid pk \"999\" - object does not exist."]);
}

#[tokio::test]
async fn authors_nest_books_and_cascade_on_delete() {
    let app = TestApp::new();
    let (_, token) = app.register("editor").await;
    let (austen, orwell, [pride, ..]) = app.seed_classics().await;

    let res = app.get(&format!("/api/authors/{}", orwell), None).await;
    assert_eq!(res.data()["books"].as_array().unwrap().len(), 2);

    let res = app.delete(&format!("/api/authors/{}", orwell), Some(&token)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(ids(app.get("/api/books", None).await.data()), vec![pride]);

    let res = app.get("/api/authors", None).await;
    assert_eq!(ids(res.data()), vec![austen]);
}

#[tokio::test]
async fn create_author_validates_name() {
    let app = TestApp::new();
    let (_, token) = app.register("editor").await;
    let res = app.post("/api/authors", Some(&token), json!({"name": "x".repeat(101)})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app.post("/api/authors", Some(&token), json!({"name": "Ursula K. Le Guin"})).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["books"], json!([]));
}
