//! Permission-gated shelf: list, add, edit, delete, search, feedback.

use crate::auth::{require_permission, AuthUser};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::filter::{BookQuery, ShelfSearch};
use crate::model::Permission;
use crate::response::{success_many_with_meta, success_one, success_one_ok};
use crate::service::{current_year, CatalogService, FeedbackForm, ShelfBookForm};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Which shelf actions the caller may take, for the listing's meta.
fn capabilities(user: &AuthUser) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("can_create".into(), Value::Bool(user.has_perm(Permission::ShelfCreate)));
    m.insert("can_edit".into(), Value::Bool(user.has_perm(Permission::ShelfEdit)));
    m.insert("can_delete".into(), Value::Bool(user.has_perm(Permission::ShelfDelete)));
    m
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ShelfView)?;
    let query = BookQuery::default();
    let books = state.store.list_books(&query).await?;
    Ok(success_many_with_meta(books, capabilities(&user)))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ShelfCreate)?;
    let book = ShelfBookForm::validate(body, current_year())?;
    Ok(success_one(CatalogService::create_book(state.store.as_ref(), book).await?))
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ShelfEdit)?;
    let book = ShelfBookForm::validate(body, current_year())?;
    Ok(success_one_ok(CatalogService::replace_book(state.store.as_ref(), id, book).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ShelfDelete)?;
    CatalogService::delete_book(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ShelfView)?;
    let search = ShelfSearch::from_params(&params);
    let books = state.store.search_books(&search).await?;
    let mut meta = Map::new();
    meta.insert("search_query".into(), Value::String(search.q));
    Ok(success_many_with_meta(books, meta))
}

/// Validated and logged; feedback is not stored.
pub async fn feedback(
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ShelfCreate)?;
    let feedback = FeedbackForm::validate(body)?;
    tracing::info!(user_id = user.id(), rating = feedback.rating, feedback = %feedback.user_feedback, "feedback received");
    Ok(success_one_ok(feedback))
}
