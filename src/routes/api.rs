//! Catalog API routes under /api.

use crate::handlers::api::{
    create_author, create_book, delete_author, delete_book, get_author, get_book, list_authors, list_books,
    patch_book, replace_book,
};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/:id",
            get(get_book).put(replace_book).patch(patch_book).delete(delete_book),
        )
        .route("/api/authors", get(list_authors).post(create_author))
        .route("/api/authors/:id", get(get_author).delete(delete_author))
        .with_state(state)
}
