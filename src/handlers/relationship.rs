//! Library/librarian app: public listings, role dashboards, permission-gated book forms,
//! and role/permission administration for Admin users.

use crate::auth::{require_permission, require_role};
use crate::error::AppError;
use crate::extractors::{CurrentUser, Identity};
use crate::filter::BookQuery;
use crate::model::{Permission, Role};
use crate::response::{success_many, success_one, success_one_ok, success_one_with_meta};
use crate::service::{
    current_year, AccountService, BookForm, CatalogService, LibraryBookForm, NameForm, PermissionForm, RoleForm,
};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

const LIBRARY_STAFF: &[Role] = &[Role::Librarian, Role::Admin];
const MEMBER_TOP_BOOKS: u32 = 5;

pub async fn list_books(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let query = BookQuery::default();
    Ok(success_many(state.store.list_books(&query).await?))
}

pub async fn library_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(CatalogService::library(state.store.as_ref(), id).await?))
}

pub async fn create_library(
    State(state): State<AppState>,
    Identity(user): Identity,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, LIBRARY_STAFF)?;
    let name = NameForm::validate(body)?;
    Ok(success_one(CatalogService::create_library(state.store.as_ref(), &name).await?))
}

pub async fn delete_library(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, LIBRARY_STAFF)?;
    CatalogService::delete_library(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attach_book(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, LIBRARY_STAFF)?;
    let book_id = LibraryBookForm::validate(body)?;
    Ok(success_one_ok(CatalogService::attach_book(state.store.as_ref(), id, book_id).await?))
}

pub async fn detach_book(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path((id, book_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, LIBRARY_STAFF)?;
    CatalogService::detach_book(state.store.as_ref(), id, book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_librarian(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, LIBRARY_STAFF)?;
    let name = NameForm::validate(body)?;
    Ok(success_one(CatalogService::assign_librarian(state.store.as_ref(), id, &name).await?))
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    Identity(user): Identity,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, &[Role::Admin])?;
    let libraries = state.store.list_libraries().await?;
    Ok(success_one_with_meta(
        json!({ "libraries": libraries }),
        json!({ "message": "Welcome, Admin! You have full system access." }),
    ))
}

pub async fn librarian_panel(
    State(state): State<AppState>,
    Identity(user): Identity,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, &[Role::Librarian])?;
    let query = BookQuery::default();
    let books = state.store.list_books(&query).await?;
    Ok(success_one_with_meta(
        json!({ "books": books }),
        json!({ "message": "Welcome, Librarian! You can manage books and libraries." }),
    ))
}

pub async fn member_page(
    State(state): State<AppState>,
    Identity(user): Identity,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, &[Role::Member])?;
    let top_books = CatalogService::latest_books(state.store.as_ref(), MEMBER_TOP_BOOKS).await?;
    Ok(success_one_with_meta(
        json!({ "top_books": top_books }),
        json!({ "message": "Welcome, Member! Enjoy browsing our resources." }),
    ))
}

pub async fn add_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::AddBook)?;
    let book = BookForm::validate(body, current_year())?;
    Ok(success_one(CatalogService::create_book(state.store.as_ref(), book).await?))
}

pub async fn edit_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::ChangeBook)?;
    let book = BookForm::validate(body, current_year())?;
    Ok(success_one_ok(CatalogService::replace_book(state.store.as_ref(), id, book).await?))
}

pub async fn delete_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&user, Permission::DeleteBook)?;
    CatalogService::delete_book(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_role(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, &[Role::Admin])?;
    let role = RoleForm::validate(body)?;
    Ok(success_one_ok(AccountService::set_role(state.store.as_ref(), user_id, role).await?))
}

pub async fn grant_permission(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, &[Role::Admin])?;
    let permission = PermissionForm::validate(body)?;
    Ok(success_one_ok(AccountService::grant(state.store.as_ref(), user_id, permission).await?))
}

pub async fn revoke_permission(
    State(state): State<AppState>,
    Identity(user): Identity,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    require_role(user, &[Role::Admin])?;
    let permission = PermissionForm::validate(body)?;
    Ok(success_one_ok(AccountService::revoke(state.store.as_ref(), user_id, permission).await?))
}
