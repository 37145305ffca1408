//! PostgreSQL store: DDL bootstrap plus the `Store` implementation over a `PgPool`.

mod accounts;
mod blog;
mod catalog;

use super::Store;
use crate::error::AppError;
use crate::filter::{BookQuery, PostSearch, ShelfSearch};
use crate::model::*;
use crate::sql::{qualified_table, quoted, QueryBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, FromRow, PgPool};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn table(&self, name: &str) -> String {
        qualified_table(&self.schema, name)
    }

    async fn fetch_all_as<T>(&self, q: &QueryBuf) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, T>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn fetch_optional_as<T>(&self, q: &QueryBuf) -> Result<Option<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, T>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }
}

/// Maps a unique-key violation to `Conflict`, everything else to `Db`.
fn conflict_on_unique(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    let unique = e
        .as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false);
    if unique {
        AppError::Conflict(message())
    } else {
        AppError::Db(e)
    }
}

/// Create the schema and every table if missing. Foreign keys carry the delete rules:
/// author -> books cascade, library/book -> membership rows cascade, post -> comments/tag links cascade.
pub async fn ensure_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
        .execute(pool)
        .await?;
    let ddl = table_ddl(schema);
    for stmt in &ddl {
        sqlx::query(stmt).execute(pool).await?;
    }
    tracing::info!(schema = %schema, tables = ddl.len(), "tables ensured");
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` statements in dependency order.
fn table_ddl(schema: &str) -> Vec<String> {
    let t = |name: &str| qualified_table(schema, name);
    vec![
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                username VARCHAR(150) NOT NULL UNIQUE,
                email TEXT NOT NULL DEFAULT '',
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            t("users")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                user_id BIGINT PRIMARY KEY REFERENCES {}(id) ON DELETE CASCADE,
                role VARCHAR(20) NOT NULL DEFAULT 'Member' CHECK (role IN ('Admin', 'Librarian', 'Member'))
            )
            "#,
            t("user_profiles"),
            t("users")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                user_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                codename TEXT NOT NULL,
                PRIMARY KEY (user_id, codename)
            )
            "#,
            t("user_permissions"),
            t("users")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                token TEXT PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#,
            t("sessions"),
            t("users")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL
            )
            "#,
            t("authors")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                publication_year INTEGER NOT NULL,
                author_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE
            )
            "#,
            t("books"),
            t("authors")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL
            )
            "#,
            t("libraries")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                library_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                book_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                PRIMARY KEY (library_id, book_id)
            )
            "#,
            t("library_books"),
            t("libraries"),
            t("books")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                library_id BIGINT PRIMARY KEY REFERENCES {}(id) ON DELETE CASCADE,
                name VARCHAR(100) NOT NULL
            )
            "#,
            t("librarians"),
            t("libraries")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                content TEXT NOT NULL,
                published_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                author_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE
            )
            "#,
            t("posts"),
            t("users")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(100) NOT NULL UNIQUE
            )
            "#,
            t("tags")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                post_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                tag_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, tag_id)
            )
            "#,
            t("post_tags"),
            t("posts"),
            t("tags")
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                post_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                author_id BIGINT NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            t("comments"),
            t("posts"),
            t("users")
        ),
    ]
}

/// Connect to the server's `postgres` database and create the target database if missing.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "database created");
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        accounts::create_user(self, user).await
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        accounts::user_by_id(self, id).await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        accounts::user_by_username(self, username).await
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError> {
        accounts::update_user(self, id, changes).await
    }

    async fn profile(&self, user_id: i64) -> Result<Option<UserProfile>, AppError> {
        accounts::profile(self, user_id).await
    }

    async fn ensure_profile(&self, user_id: i64) -> Result<UserProfile, AppError> {
        accounts::ensure_profile(self, user_id).await
    }

    async fn set_role(&self, user_id: i64, role: Role) -> Result<UserProfile, AppError> {
        accounts::set_role(self, user_id, role).await
    }

    async fn permissions(&self, user_id: i64) -> Result<Vec<Permission>, AppError> {
        accounts::permissions(self, user_id).await
    }

    async fn grant_permission(&self, user_id: i64, permission: Permission) -> Result<(), AppError> {
        accounts::grant_permission(self, user_id, permission).await
    }

    async fn revoke_permission(&self, user_id: i64, permission: Permission) -> Result<bool, AppError> {
        accounts::revoke_permission(self, user_id, permission).await
    }

    async fn create_session(&self, session: Session) -> Result<(), AppError> {
        accounts::create_session(self, session).await
    }

    async fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError> {
        accounts::session_user(self, token, now).await
    }

    async fn delete_session(&self, token: &str) -> Result<bool, AppError> {
        accounts::delete_session(self, token).await
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        accounts::purge_expired_sessions(self, now).await
    }

    async fn create_author(&self, name: &str) -> Result<Author, AppError> {
        catalog::create_author(self, name).await
    }

    async fn author(&self, id: i64) -> Result<Option<Author>, AppError> {
        catalog::author(self, id).await
    }

    async fn list_authors(&self) -> Result<Vec<Author>, AppError> {
        catalog::list_authors(self).await
    }

    async fn delete_author(&self, id: i64) -> Result<bool, AppError> {
        catalog::delete_by_id(self, "authors", id).await
    }

    async fn create_book(&self, book: NewBook) -> Result<Book, AppError> {
        catalog::create_book(self, book).await
    }

    async fn book(&self, id: i64) -> Result<Option<BookWithAuthor>, AppError> {
        self.fetch_optional_as(&crate::sql::select_book_by_id(&self.schema, id)).await
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Vec<BookWithAuthor>, AppError> {
        self.fetch_all_as(&crate::sql::select_books(&self.schema, query)).await
    }

    async fn search_books(&self, search: &ShelfSearch) -> Result<Vec<BookWithAuthor>, AppError> {
        if search.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_all_as(&crate::sql::select_books_matching(&self.schema, search)).await
    }

    async fn books_by_author(&self, author_id: i64) -> Result<Vec<Book>, AppError> {
        catalog::books_by_author(self, author_id).await
    }

    async fn update_book(&self, id: i64, changes: &BookChanges) -> Result<Option<Book>, AppError> {
        catalog::update_book(self, id, changes).await
    }

    async fn delete_book(&self, id: i64) -> Result<bool, AppError> {
        catalog::delete_by_id(self, "books", id).await
    }

    async fn create_library(&self, name: &str) -> Result<Library, AppError> {
        catalog::create_library(self, name).await
    }

    async fn library(&self, id: i64) -> Result<Option<Library>, AppError> {
        catalog::library(self, id).await
    }

    async fn list_libraries(&self) -> Result<Vec<Library>, AppError> {
        catalog::list_libraries(self).await
    }

    async fn delete_library(&self, id: i64) -> Result<bool, AppError> {
        catalog::delete_by_id(self, "libraries", id).await
    }

    async fn add_library_book(&self, library_id: i64, book_id: i64) -> Result<(), AppError> {
        catalog::add_library_book(self, library_id, book_id).await
    }

    async fn remove_library_book(&self, library_id: i64, book_id: i64) -> Result<bool, AppError> {
        catalog::remove_library_book(self, library_id, book_id).await
    }

    async fn library_books(&self, library_id: i64) -> Result<Vec<BookWithAuthor>, AppError> {
        self.fetch_all_as(&crate::sql::select_library_books(&self.schema, library_id)).await
    }

    async fn create_librarian(&self, library_id: i64, name: &str) -> Result<Librarian, AppError> {
        catalog::create_librarian(self, library_id, name).await
    }

    async fn librarian(&self, library_id: i64) -> Result<Option<Librarian>, AppError> {
        catalog::librarian(self, library_id).await
    }

    async fn create_post(&self, author_id: i64, post: &PostContent, at: DateTime<Utc>) -> Result<PostView, AppError> {
        blog::create_post(self, author_id, post, at).await
    }

    async fn post(&self, id: i64) -> Result<Option<PostView>, AppError> {
        Ok(blog::posts(self, crate::sql::PostFilter::Id(id)).await?.into_iter().next())
    }

    async fn list_posts(&self) -> Result<Vec<PostView>, AppError> {
        blog::posts(self, crate::sql::PostFilter::All).await
    }

    async fn search_posts(&self, search: &PostSearch) -> Result<Vec<PostView>, AppError> {
        if search.is_empty() {
            return Ok(Vec::new());
        }
        blog::posts(self, crate::sql::PostFilter::Search(search)).await
    }

    async fn posts_by_tag(&self, slug: &str) -> Result<Vec<PostView>, AppError> {
        blog::posts(self, crate::sql::PostFilter::TagSlug(slug)).await
    }

    async fn tag(&self, slug: &str) -> Result<Option<Tag>, AppError> {
        blog::tag(self, slug).await
    }

    async fn update_post(&self, id: i64, post: &PostContent) -> Result<Option<PostView>, AppError> {
        blog::update_post(self, id, post).await
    }

    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        catalog::delete_by_id(self, "posts", id).await
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, content: &str, at: DateTime<Utc>) -> Result<Comment, AppError> {
        blog::create_comment(self, post_id, author_id, content, at).await
    }

    async fn comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        blog::comment(self, id).await
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, AppError> {
        blog::comments_for_post(self, post_id).await
    }

    async fn update_comment(&self, id: i64, content: &str, at: DateTime<Utc>) -> Result<Option<Comment>, AppError> {
        blog::update_comment(self, id, content, at).await
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        catalog::delete_by_id(self, "comments", id).await
    }
}
