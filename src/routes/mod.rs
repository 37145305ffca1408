//! Routers per app, merged into one application router.

mod accounts;
mod api;
mod blog;
mod bookshelf;
mod common;
mod relationship;

pub use accounts::account_routes;
pub use api::api_routes;
pub use blog::blog_routes;
pub use bookshelf::bookshelf_routes;
pub use common::common_routes;
pub use relationship::relationship_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Every app's routes with request tracing and the body size limit.
pub fn app_router(state: AppState) -> Router {
    let body_limit = state.settings.body_limit_bytes;
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(account_routes(state.clone()))
        .merge(api_routes(state.clone()))
        .merge(relationship_routes(state.clone()))
        .merge(bookshelf_routes(state.clone()))
        .merge(blog_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
}
