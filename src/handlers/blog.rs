//! Blog: posts, comments, tag listing and search.

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::filter::PostSearch;
use crate::response::{success_many, success_many_with_meta, success_one, success_one_ok};
use crate::service::{BlogService, CommentForm, PostForm};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.store.list_posts().await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let content = PostForm::validate(body)?;
    Ok(success_one(BlogService::create_post(state.store.as_ref(), &user, content, Utc::now()).await?))
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(BlogService::post_detail(state.store.as_ref(), id).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let content = PostForm::validate(body)?;
    Ok(success_one_ok(BlogService::update_post(state.store.as_ref(), &user, id, content).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    BlogService::delete_post(state.store.as_ref(), &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let content = CommentForm::validate(body)?;
    let comment = BlogService::create_comment(state.store.as_ref(), &user, post_id, &content, Utc::now()).await?;
    Ok(success_one(comment))
}

pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let content = CommentForm::validate(body)?;
    let comment = BlogService::update_comment(state.store.as_ref(), &user, id, &content, Utc::now()).await?;
    Ok(success_one_ok(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    BlogService::delete_comment(state.store.as_ref(), &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let search = PostSearch::from_params(&params);
    let posts = BlogService::search(state.store.as_ref(), &search).await?;
    let mut meta = Map::new();
    meta.insert("query".into(), Value::String(search.q));
    Ok(success_many_with_meta(posts, meta))
}

pub async fn posts_by_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tagged = BlogService::tagged(state.store.as_ref(), &slug).await?;
    let mut meta = Map::new();
    meta.insert("tag".into(), serde_json::to_value(&tagged.tag).map_err(|e| AppError::Internal(e.to_string()))?);
    Ok(success_many_with_meta(tagged.posts, meta))
}
