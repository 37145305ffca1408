//! Book, author and library operations on top of the store.

use crate::error::AppError;
use crate::filter::{BookField, BookQuery, OrderTerm};
use crate::model::*;
use crate::store::Store;
use chrono::{Datelike, Utc};

/// Calendar year used by the "not in the future" rule.
pub fn current_year() -> i32 {
    Utc::now().year()
}

pub struct CatalogService;

impl CatalogService {
    pub async fn book(store: &dyn Store, id: i64) -> Result<BookWithAuthor, AppError> {
        store
            .book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book {}", id)))
    }

    async fn reload(store: &dyn Store, book: Book) -> Result<BookWithAuthor, AppError> {
        store
            .book(book.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("book {} vanished after write", book.id)))
    }

    pub async fn create_book(store: &dyn Store, book: NewBook) -> Result<BookWithAuthor, AppError> {
        let created = store.create_book(book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "book created");
        Self::reload(store, created).await
    }

    /// Full update: every field replaced.
    pub async fn replace_book(store: &dyn Store, id: i64, book: NewBook) -> Result<BookWithAuthor, AppError> {
        Self::update_book(store, id, BookChanges::from(book)).await
    }

    pub async fn update_book(store: &dyn Store, id: i64, changes: BookChanges) -> Result<BookWithAuthor, AppError> {
        let updated = store
            .update_book(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book {}", id)))?;
        tracing::info!(book_id = id, "book updated");
        Self::reload(store, updated).await
    }

    pub async fn delete_book(store: &dyn Store, id: i64) -> Result<(), AppError> {
        if !store.delete_book(id).await? {
            return Err(AppError::NotFound(format!("book {}", id)));
        }
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// The `n` most recently added books.
    pub async fn latest_books(store: &dyn Store, n: u32) -> Result<Vec<BookWithAuthor>, AppError> {
        let query = BookQuery {
            ordering: vec![OrderTerm {
                field: BookField::Id,
                descending: true,
            }],
            limit: Some(n),
            ..Default::default()
        };
        store.list_books(&query).await
    }

    async fn author_detail_of(store: &dyn Store, author: Author) -> Result<AuthorDetail, AppError> {
        let books = store.books_by_author(author.id).await?;
        Ok(AuthorDetail {
            id: author.id,
            name: author.name,
            books,
        })
    }

    pub async fn create_author(store: &dyn Store, name: &str) -> Result<AuthorDetail, AppError> {
        let author = store.create_author(name).await?;
        tracing::info!(author_id = author.id, "author created");
        Ok(AuthorDetail {
            id: author.id,
            name: author.name,
            books: Vec::new(),
        })
    }

    pub async fn author(store: &dyn Store, id: i64) -> Result<AuthorDetail, AppError> {
        let author = store
            .author(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("author {}", id)))?;
        Self::author_detail_of(store, author).await
    }

    pub async fn list_authors(store: &dyn Store) -> Result<Vec<AuthorDetail>, AppError> {
        let mut out = Vec::new();
        for author in store.list_authors().await? {
            out.push(Self::author_detail_of(store, author).await?);
        }
        Ok(out)
    }

    /// Removes the author together with all of their books.
    pub async fn delete_author(store: &dyn Store, id: i64) -> Result<(), AppError> {
        if !store.delete_author(id).await? {
            return Err(AppError::NotFound(format!("author {}", id)));
        }
        tracing::info!(author_id = id, "author deleted with their books");
        Ok(())
    }

    pub async fn library(store: &dyn Store, id: i64) -> Result<LibraryDetail, AppError> {
        let library = store
            .library(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("library {}", id)))?;
        let librarian = store.librarian(id).await?;
        let books = store.library_books(id).await?;
        Ok(LibraryDetail {
            id: library.id,
            name: library.name,
            librarian,
            books,
        })
    }

    pub async fn create_library(store: &dyn Store, name: &str) -> Result<Library, AppError> {
        let library = store.create_library(name).await?;
        tracing::info!(library_id = library.id, "library created");
        Ok(library)
    }

    /// Detaches the library's books; the books themselves survive.
    pub async fn delete_library(store: &dyn Store, id: i64) -> Result<(), AppError> {
        if !store.delete_library(id).await? {
            return Err(AppError::NotFound(format!("library {}", id)));
        }
        tracing::info!(library_id = id, "library deleted");
        Ok(())
    }

    pub async fn attach_book(store: &dyn Store, library_id: i64, book_id: i64) -> Result<LibraryDetail, AppError> {
        store.add_library_book(library_id, book_id).await?;
        tracing::info!(library_id, book_id, "book attached to library");
        Self::library(store, library_id).await
    }

    pub async fn detach_book(store: &dyn Store, library_id: i64, book_id: i64) -> Result<(), AppError> {
        if !store.remove_library_book(library_id, book_id).await? {
            return Err(AppError::NotFound(format!("book {} in library {}", book_id, library_id)));
        }
        tracing::info!(library_id, book_id, "book detached from library");
        Ok(())
    }

    pub async fn assign_librarian(store: &dyn Store, library_id: i64, name: &str) -> Result<Librarian, AppError> {
        let librarian = store.create_librarian(library_id, name).await?;
        tracing::info!(library_id, "librarian assigned");
        Ok(librarian)
    }
}
