//! Repository interface over every entity, with PostgreSQL and in-memory backends.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, ensure_tables, PgStore};

use crate::config::Settings;
use crate::error::AppError;
use crate::filter::{BookQuery, PostSearch, ShelfSearch};
use crate::model::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// PostgreSQL when `DATABASE_URL` is set (database and tables created if missing), else in-memory.
pub async fn open_store(settings: &Settings) -> Result<Arc<dyn Store>, AppError> {
    let Some(url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using the in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    };
    ensure_database_exists(url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(url)
        .await?;
    ensure_tables(&pool, &settings.db_schema).await?;
    tracing::info!(schema = %settings.db_schema, "connected to PostgreSQL");
    Ok(Arc::new(PgStore::new(pool, settings.db_schema.clone())))
}

/// Persistence for all apps. Every method is one all-or-nothing write or a read.
///
/// Lookups by id return `Ok(None)` when missing; callers decide whether that is a 404.
#[async_trait]
pub trait Store: Send + Sync {
    /// Readiness probe.
    async fn ping(&self) -> Result<(), AppError>;

    // accounts
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError>;
    async fn profile(&self, user_id: i64) -> Result<Option<UserProfile>, AppError>;
    /// Creates a Member profile unless one exists; returns the stored profile either way.
    async fn ensure_profile(&self, user_id: i64) -> Result<UserProfile, AppError>;
    async fn set_role(&self, user_id: i64, role: Role) -> Result<UserProfile, AppError>;
    async fn permissions(&self, user_id: i64) -> Result<Vec<Permission>, AppError>;
    async fn grant_permission(&self, user_id: i64, permission: Permission) -> Result<(), AppError>;
    async fn revoke_permission(&self, user_id: i64, permission: Permission) -> Result<bool, AppError>;
    async fn create_session(&self, session: Session) -> Result<(), AppError>;
    /// The user owning an unexpired session.
    async fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError>;
    async fn delete_session(&self, token: &str) -> Result<bool, AppError>;
    /// Drop every session expired at `now`; returns how many went.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError>;

    // catalog
    async fn create_author(&self, name: &str) -> Result<Author, AppError>;
    async fn author(&self, id: i64) -> Result<Option<Author>, AppError>;
    async fn list_authors(&self) -> Result<Vec<Author>, AppError>;
    /// Deletes the author and, with them, all their books.
    async fn delete_author(&self, id: i64) -> Result<bool, AppError>;
    async fn create_book(&self, book: NewBook) -> Result<Book, AppError>;
    async fn book(&self, id: i64) -> Result<Option<BookWithAuthor>, AppError>;
    async fn list_books(&self, query: &BookQuery) -> Result<Vec<BookWithAuthor>, AppError>;
    async fn search_books(&self, search: &ShelfSearch) -> Result<Vec<BookWithAuthor>, AppError>;
    async fn books_by_author(&self, author_id: i64) -> Result<Vec<Book>, AppError>;
    async fn update_book(&self, id: i64, changes: &BookChanges) -> Result<Option<Book>, AppError>;
    async fn delete_book(&self, id: i64) -> Result<bool, AppError>;
    async fn create_library(&self, name: &str) -> Result<Library, AppError>;
    async fn library(&self, id: i64) -> Result<Option<Library>, AppError>;
    async fn list_libraries(&self) -> Result<Vec<Library>, AppError>;
    /// Deletes the library and its librarian; books are only detached.
    async fn delete_library(&self, id: i64) -> Result<bool, AppError>;
    /// Idempotent.
    async fn add_library_book(&self, library_id: i64, book_id: i64) -> Result<(), AppError>;
    async fn remove_library_book(&self, library_id: i64, book_id: i64) -> Result<bool, AppError>;
    async fn library_books(&self, library_id: i64) -> Result<Vec<BookWithAuthor>, AppError>;
    /// Conflict when the library already has a librarian.
    async fn create_librarian(&self, library_id: i64, name: &str) -> Result<Librarian, AppError>;
    async fn librarian(&self, library_id: i64) -> Result<Option<Librarian>, AppError>;

    // blog
    async fn create_post(&self, author_id: i64, post: &PostContent, at: DateTime<Utc>) -> Result<PostView, AppError>;
    async fn post(&self, id: i64) -> Result<Option<PostView>, AppError>;
    /// Newest first.
    async fn list_posts(&self) -> Result<Vec<PostView>, AppError>;
    async fn search_posts(&self, search: &PostSearch) -> Result<Vec<PostView>, AppError>;
    async fn posts_by_tag(&self, slug: &str) -> Result<Vec<PostView>, AppError>;
    async fn tag(&self, slug: &str) -> Result<Option<Tag>, AppError>;
    /// Replaces title, content and the full tag set.
    async fn update_post(&self, id: i64, post: &PostContent) -> Result<Option<PostView>, AppError>;
    /// Deletes the post with its comments and tag links.
    async fn delete_post(&self, id: i64) -> Result<bool, AppError>;
    async fn create_comment(&self, post_id: i64, author_id: i64, content: &str, at: DateTime<Utc>) -> Result<Comment, AppError>;
    async fn comment(&self, id: i64) -> Result<Option<Comment>, AppError>;
    /// Newest first.
    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, AppError>;
    async fn update_comment(&self, id: i64, content: &str, at: DateTime<Utc>) -> Result<Option<Comment>, AppError>;
    async fn delete_comment(&self, id: i64) -> Result<bool, AppError>;
}
