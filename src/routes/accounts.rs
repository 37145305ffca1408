//! Account routes shared by every app.

use crate::handlers::accounts::{login, logout, profile, register, update_profile};
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn account_routes(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile).post(update_profile))
        .with_state(state)
}
