//! Register, login, logout and profile.

use crate::auth::session::{clear_cookie_value, set_cookie_value};
use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::response::{success_one, success_one_ok};
use crate::service::{AccountService, AccountView, LoginForm, ProfileForm, RegisterForm};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::Value;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let form = RegisterForm::validate(body)?;
    let signed_in = AccountService::register(state.store.as_ref(), &state.settings, form, Utc::now()).await?;
    let cookie = set_cookie_value(&signed_in.token, state.settings.session_ttl_hours);
    Ok(([(header::SET_COOKIE, cookie)], success_one(signed_in)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = LoginForm::validate(body)?;
    let signed_in = AccountService::login(state.store.as_ref(), &state.settings, credentials, Utc::now()).await?;
    let cookie = set_cookie_value(&signed_in.token, state.settings.session_ttl_hours);
    Ok(([(header::SET_COOKIE, cookie)], success_one_ok(signed_in)))
}

pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    AccountService::logout(state.store.as_ref(), &user).await?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, clear_cookie_value())]))
}

pub async fn profile(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(AccountView::of(&user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let changes = ProfileForm::validate(body)?;
    let account = AccountService::update_profile(state.store.as_ref(), &user, changes).await?;
    Ok(success_one_ok(account))
}
