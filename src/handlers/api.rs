//! Catalog REST API: books with filtering, search and ordering; authors with nested books.
//! Reads are public, writes need a session.

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::filter::BookQuery;
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::{current_year, BookForm, CatalogService, NameForm};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let query = BookQuery::from_params(&params)?;
    tracing::debug!(?query, "list books");
    let rows = state.store.list_books(&query).await?;
    Ok(success_many(rows))
}

pub async fn create_book(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let book = BookForm::validate(body, current_year())?;
    let row = CatalogService::create_book(state.store.as_ref(), book).await?;
    Ok(success_one(row))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = CatalogService::book(state.store.as_ref(), id).await?;
    Ok(success_one_ok(row))
}

pub async fn replace_book(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let book = BookForm::validate(body, current_year())?;
    let row = CatalogService::replace_book(state.store.as_ref(), id, book).await?;
    Ok(success_one_ok(row))
}

pub async fn patch_book(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let changes = BookForm::validate_partial(body, current_year())?;
    let row = CatalogService::update_book(state.store.as_ref(), id, changes).await?;
    Ok(success_one_ok(row))
}

pub async fn delete_book(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    CatalogService::delete_book(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_authors(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = CatalogService::list_authors(state.store.as_ref()).await?;
    Ok(success_many(rows))
}

pub async fn create_author(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let name = NameForm::validate(body)?;
    let author = CatalogService::create_author(state.store.as_ref(), &name).await?;
    Ok(success_one(author))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let author = CatalogService::author(state.store.as_ref(), id).await?;
    Ok(success_one_ok(author))
}

pub async fn delete_author(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    CatalogService::delete_author(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
