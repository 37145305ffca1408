mod common;

use axum::http::StatusCode;
use common::{ids, TestApp};
use serde_json::json;

async fn new_post(app: &TestApp, token: &str, title: &str, tags: serde_json::Value) -> i64 {
    let res = app
        .post("/blog/post/new", Some(token), json!({"title": title, "content": format!("All about {}", title), "tags": tags}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    res.data()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn posts_list_newest_first() {
    let app = TestApp::new();
    let (author_id, token) = app.register("writer").await;
    let first = new_post(&app, &token, "First", json!([])).await;
    let second = new_post(&app, &token, "Second", json!([])).await;

    let res = app.get("/blog/", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(res.data()), vec![second, first]);
    assert_eq!(res.data()[0]["author"], author_id);
    assert_eq!(res.data()[0]["author_username"], "writer");
}

#[tokio::test]
async fn anonymous_cannot_post() {
    let app = TestApp::new();
    let res = app.post("/blog/post/new", None, json!({"title": "Hi", "content": "there"})).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.get("/blog/", None).await.body["meta"]["count"], 0);
}

#[tokio::test]
async fn only_the_author_may_update_or_delete() {
    let app = TestApp::new();
    let (_, owner) = app.register("owner").await;
    let (_, intruder) = app.register("intruder").await;
    let id = new_post(&app, &owner, "Mine", json!([])).await;
    let update = json!({"title": "Hijacked", "content": "..."});

    let res = app.put(&format!("/blog/post/{}/update", id), Some(&intruder), update.clone()).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.delete(&format!("/blog/post/{}/delete", id), Some(&intruder)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&format!("/blog/post/{}", id), None).await.data()["title"], "Mine");

    let res = app.put(&format!("/blog/post/{}/update", id), Some(&owner), update).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["title"], "Hijacked");
    let res = app.delete(&format!("/blog/post/{}/delete", id), Some(&owner)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&format!("/blog/post/{}", id), None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_are_owned_and_removed_with_their_post() {
    let app = TestApp::new();
    let (_, owner) = app.register("owner").await;
    let (_, reader) = app.register("reader").await;
    let post = new_post(&app, &owner, "Discuss", json!([])).await;

    let res = app
        .post(&format!("/blog/post/{}/comments/new", post), Some(&reader), json!({"content": "Great read"}))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let comment = res.data()["id"].as_i64().unwrap();

    let res = app.put(&format!("/blog/comment/{}/update", comment), Some(&owner), json!({"content": "edited"})).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    let res = app.put(&format!("/blog/comment/{}/update", comment), Some(&reader), json!({"content": "Really great"})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["content"], "Really great");

    let detail = app.get(&format!("/blog/post/{}", post), None).await;
    assert_eq!(detail.data()["comments"][0]["author_username"], "reader");

    let res = app
        .post(&format!("/blog/post/{}/comments/new", post), Some(&reader), json!({"content": "   "}))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    app.delete(&format!("/blog/post/{}/delete", post), Some(&owner)).await;
    let res = app.delete(&format!("/blog/comment/{}/delete", comment), Some(&reader)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_not_found() {
    let app = TestApp::new();
    let (_, token) = app.register("reader").await;
    let res = app.post("/blog/post/42/comments/new", Some(&token), json!({"content": "hello?"})).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tags_and_search() {
    let app = TestApp::new();
    let (_, token) = app.register("writer").await;
    let rust = new_post(&app, &token, "Ownership", json!(["Rust, Systems"])).await;
    let web = new_post(&app, &token, "Routing", json!(["Web Dev", "rust"])).await;
    new_post(&app, &token, "Gardening", json!([])).await;

    let res = app.get("/blog/tags/rust", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ids(res.data()), vec![web, rust]);
    assert_eq!(res.body["meta"]["tag"]["slug"], "rust");

    let res = app.get("/blog/tags/web-dev", None).await;
    assert_eq!(ids(res.data()), vec![web]);
    assert_eq!(app.get("/blog/tags/nothing", None).await.status, StatusCode::NOT_FOUND);

    let res = app.get("/blog/search?q=systems", None).await;
    assert_eq!(ids(res.data()), vec![rust]);
    let res = app.get("/blog/search?q=ROUTING", None).await;
    assert_eq!(ids(res.data()), vec![web]);
    let res = app.get("/blog/search?q=", None).await;
    assert_eq!(res.body["meta"]["count"], 0);
}
