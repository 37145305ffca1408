//! Blog routes under /blog.

use crate::handlers::blog::*;
use crate::state::AppState;
use axum::{routing::{delete, get, post, put}, Router};

pub fn blog_routes(state: AppState) -> Router {
    Router::new()
        .route("/blog/", get(list_posts))
        .route("/blog/post/new", post(create_post))
        .route("/blog/post/:id", get(post_detail))
        .route("/blog/post/:id/update", put(update_post))
        .route("/blog/post/:id/delete", delete(delete_post))
        .route("/blog/post/:id/comments/new", post(create_comment))
        .route("/blog/comment/:id/update", put(update_comment))
        .route("/blog/comment/:id/delete", delete(delete_comment))
        .route("/blog/search", get(search))
        .route("/blog/tags/:slug", get(posts_by_tag))
        .with_state(state)
}
