//! Authors, books, libraries, librarians.

use super::{conflict_on_unique, PgStore};
use crate::error::AppError;
use crate::model::*;

fn missing_pk(field: &str, id: i64) -> AppError {
    AppError::field(field, format!("Invalid pk \"{}\" - object does not exist.", id))
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|d| d.is_foreign_key_violation())
        .unwrap_or(false)
}

/// DELETE by id; dependents go through the foreign keys' ON DELETE rules.
pub(super) async fn delete_by_id(store: &PgStore, table: &str, id: i64) -> Result<bool, AppError> {
    let sql = format!("DELETE FROM {} WHERE id = $1", store.table(table));
    tracing::debug!(sql = %sql, id, "query");
    let res = sqlx::query(&sql).bind(id).execute(store.pool()).await?;
    Ok(res.rows_affected() > 0)
}

pub(super) async fn create_author(store: &PgStore, name: &str) -> Result<Author, AppError> {
    let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id, name", store.table("authors"));
    tracing::debug!(sql = %sql, "query");
    Ok(sqlx::query_as::<_, Author>(&sql)
        .bind(name)
        .fetch_one(store.pool())
        .await?)
}

pub(super) async fn author(store: &PgStore, id: i64) -> Result<Option<Author>, AppError> {
    let sql = format!("SELECT id, name FROM {} WHERE id = $1", store.table("authors"));
    Ok(sqlx::query_as::<_, Author>(&sql)
        .bind(id)
        .fetch_optional(store.pool())
        .await?)
}

pub(super) async fn list_authors(store: &PgStore) -> Result<Vec<Author>, AppError> {
    let sql = format!("SELECT id, name FROM {} ORDER BY id", store.table("authors"));
    Ok(sqlx::query_as::<_, Author>(&sql).fetch_all(store.pool()).await?)
}

pub(super) async fn create_book(store: &PgStore, book: NewBook) -> Result<Book, AppError> {
    let sql = format!(
        "INSERT INTO {} (title, publication_year, author_id) VALUES ($1, $2, $3) \
         RETURNING id, title, publication_year, author_id",
        store.table("books")
    );
    tracing::debug!(sql = %sql, "query");
    sqlx::query_as::<_, Book>(&sql)
        .bind(&book.title)
        .bind(book.publication_year)
        .bind(book.author_id)
        .fetch_one(store.pool())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                missing_pk("author", book.author_id)
            } else {
                AppError::Db(e)
            }
        })
}

pub(super) async fn books_by_author(store: &PgStore, author_id: i64) -> Result<Vec<Book>, AppError> {
    let sql = format!(
        "SELECT id, title, publication_year, author_id FROM {} WHERE author_id = $1 ORDER BY id",
        store.table("books")
    );
    Ok(sqlx::query_as::<_, Book>(&sql)
        .bind(author_id)
        .fetch_all(store.pool())
        .await?)
}

pub(super) async fn update_book(store: &PgStore, id: i64, changes: &BookChanges) -> Result<Option<Book>, AppError> {
    let sql = format!(
        "UPDATE {} SET title = COALESCE($2, title), publication_year = COALESCE($3, publication_year), \
         author_id = COALESCE($4, author_id) WHERE id = $1 RETURNING id, title, publication_year, author_id",
        store.table("books")
    );
    tracing::debug!(sql = %sql, id, "query");
    sqlx::query_as::<_, Book>(&sql)
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.publication_year)
        .bind(changes.author_id)
        .fetch_optional(store.pool())
        .await
        .map_err(|e| match changes.author_id {
            Some(author_id) if is_foreign_key_violation(&e) => missing_pk("author", author_id),
            _ => AppError::Db(e),
        })
}

pub(super) async fn create_library(store: &PgStore, name: &str) -> Result<Library, AppError> {
    let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id, name", store.table("libraries"));
    tracing::debug!(sql = %sql, "query");
    Ok(sqlx::query_as::<_, Library>(&sql)
        .bind(name)
        .fetch_one(store.pool())
        .await?)
}

pub(super) async fn library(store: &PgStore, id: i64) -> Result<Option<Library>, AppError> {
    let sql = format!("SELECT id, name FROM {} WHERE id = $1", store.table("libraries"));
    Ok(sqlx::query_as::<_, Library>(&sql)
        .bind(id)
        .fetch_optional(store.pool())
        .await?)
}

pub(super) async fn list_libraries(store: &PgStore) -> Result<Vec<Library>, AppError> {
    let sql = format!("SELECT id, name FROM {} ORDER BY id", store.table("libraries"));
    Ok(sqlx::query_as::<_, Library>(&sql).fetch_all(store.pool()).await?)
}

pub(super) async fn add_library_book(store: &PgStore, library_id: i64, book_id: i64) -> Result<(), AppError> {
    if library(store, library_id).await?.is_none() {
        return Err(AppError::NotFound(format!("library {}", library_id)));
    }
    let sql = format!(
        "INSERT INTO {} (library_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        store.table("library_books")
    );
    tracing::debug!(sql = %sql, library_id, book_id, "query");
    sqlx::query(&sql)
        .bind(library_id)
        .bind(book_id)
        .execute(store.pool())
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                missing_pk("book", book_id)
            } else {
                AppError::Db(e)
            }
        })?;
    Ok(())
}

pub(super) async fn remove_library_book(store: &PgStore, library_id: i64, book_id: i64) -> Result<bool, AppError> {
    let sql = format!(
        "DELETE FROM {} WHERE library_id = $1 AND book_id = $2",
        store.table("library_books")
    );
    let res = sqlx::query(&sql)
        .bind(library_id)
        .bind(book_id)
        .execute(store.pool())
        .await?;
    Ok(res.rows_affected() > 0)
}

pub(super) async fn create_librarian(store: &PgStore, library_id: i64, name: &str) -> Result<Librarian, AppError> {
    if library(store, library_id).await?.is_none() {
        return Err(AppError::NotFound(format!("library {}", library_id)));
    }
    let sql = format!(
        "INSERT INTO {} (library_id, name) VALUES ($1, $2) RETURNING library_id, name",
        store.table("librarians")
    );
    tracing::debug!(sql = %sql, library_id, "query");
    sqlx::query_as::<_, Librarian>(&sql)
        .bind(library_id)
        .bind(name)
        .fetch_one(store.pool())
        .await
        .map_err(|e| conflict_on_unique(e, || format!("library {} already has a librarian", library_id)))
}

pub(super) async fn librarian(store: &PgStore, library_id: i64) -> Result<Option<Librarian>, AppError> {
    let sql = format!("SELECT library_id, name FROM {} WHERE library_id = $1", store.table("librarians"));
    Ok(sqlx::query_as::<_, Librarian>(&sql)
        .bind(library_id)
        .fetch_optional(store.pool())
        .await?)
}
