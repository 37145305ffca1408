//! Shared harness: the full router over a fresh in-memory store.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bookshelf::model::{Permission, Role};
use bookshelf::{app_router, AppState, MemoryStore, Settings, Store};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl Response {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn field_errors(&self, field: &str) -> Vec<String> {
        self.body["error"]["details"][field]
            .as_array()
            .map(|a| a.iter().filter_map(|m| m.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }
}

pub fn test_settings() -> Settings {
    Settings {
        password_iterations: 1,
        ..Settings::default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), settings);
        TestApp {
            router: app_router(state),
            store,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", t));
        }
        let req = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Response { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Registers through the API; returns (user id, session token).
    pub async fn register(&self, username: &str) -> (i64, String) {
        let res = self
            .post(
                "/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password1": "correct-horse",
                    "password2": "correct-horse"
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        let id = res.data()["user"]["id"].as_i64().unwrap();
        let token = res.data()["token"].as_str().unwrap().to_string();
        (id, token)
    }

    pub async fn register_with_role(&self, username: &str, role: Role) -> (i64, String) {
        let (id, token) = self.register(username).await;
        self.store.set_role(id, role).await.unwrap();
        (id, token)
    }

    pub async fn register_with_perms(&self, username: &str, perms: &[Permission]) -> (i64, String) {
        let (id, token) = self.register(username).await;
        for p in perms {
            self.store.grant_permission(id, *p).await.unwrap();
        }
        (id, token)
    }

    pub async fn author(&self, name: &str) -> i64 {
        self.store.create_author(name).await.unwrap().id
    }

    pub async fn book(&self, title: &str, year: i32, author_id: i64) -> i64 {
        self.store
            .create_book(bookshelf::model::NewBook {
                title: title.into(),
                publication_year: year,
                author_id,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn store_library(&self, name: &str) -> i64 {
        self.store.create_library(name).await.unwrap().id
    }

    /// Austen 1813, Orwell 1945 and 1949.
    pub async fn seed_classics(&self) -> (i64, i64, [i64; 3]) {
        let austen = self.author("Jane Austen").await;
        let orwell = self.author("George Orwell").await;
        let pride = self.book("Pride and Prejudice", 1813, austen).await;
        let farm = self.book("Animal Farm", 1945, orwell).await;
        let nineteen = self.book("Nineteen Eighty-Four", 1949, orwell).await;
        (austen, orwell, [pride, farm, nineteen])
    }

    pub async fn book_count(&self) -> usize {
        self.get("/api/books", None).await.data().as_array().unwrap().len()
    }
}

pub fn ids(v: &Value) -> Vec<i64> {
    v.as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect()
}
