//! Library/librarian app routes under /relationship.

use crate::handlers::relationship::*;
use crate::state::AppState;
use axum::{routing::{delete, get, post, put}, Router};

pub fn relationship_routes(state: AppState) -> Router {
    Router::new()
        .route("/relationship/books", get(list_books))
        .route("/relationship/libraries", post(create_library))
        .route("/relationship/library/:id", get(library_detail).delete(delete_library))
        .route("/relationship/library/:id/books", post(attach_book))
        .route("/relationship/library/:id/books/:book_id", delete(detach_book))
        .route("/relationship/library/:id/librarian", post(assign_librarian))
        .route("/relationship/admin-dashboard", get(admin_dashboard))
        .route("/relationship/librarian-panel", get(librarian_panel))
        .route("/relationship/member-page", get(member_page))
        .route("/relationship/book/add", post(add_book))
        .route("/relationship/book/edit/:id", post(edit_book))
        .route("/relationship/book/delete/:id", post(delete_book))
        .route("/relationship/users/:id/role", put(set_role))
        .route(
            "/relationship/users/:id/permissions",
            post(grant_permission).delete(revoke_permission),
        )
        .with_state(state)
}
