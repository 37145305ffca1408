//! Shelf routes under /bookshelf.

use crate::handlers::bookshelf::{create, delete, edit, feedback, list, search};
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn bookshelf_routes(state: AppState) -> Router {
    Router::new()
        .route("/bookshelf/books", get(list).post(create))
        .route("/bookshelf/books/:id/edit", post(edit))
        .route("/bookshelf/books/:id/delete", post(delete))
        .route("/bookshelf/search", get(search))
        .route("/bookshelf/feedback", post(feedback))
        .with_state(state)
}
