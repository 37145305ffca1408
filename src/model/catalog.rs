//! Catalog entities: authors, books, libraries, librarians.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publication_year: i32,
    #[serde(rename = "author")]
    pub author_id: i64,
}

/// Book joined with its author's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookWithAuthor {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub book: Book,
    pub author_name: String,
}

/// Author with every book they wrote, ordered by id.
#[derive(Clone, Debug, Serialize)]
pub struct AuthorDetail {
    pub id: i64,
    pub name: String,
    pub books: Vec<Book>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Library {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Librarian {
    pub library_id: i64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LibraryDetail {
    pub id: i64,
    pub name: String,
    pub librarian: Option<Librarian>,
    pub books: Vec<BookWithAuthor>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub publication_year: i32,
    pub author_id: i64,
}

/// Partial book update; `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author_id: Option<i64>,
}

impl BookChanges {
    pub fn apply(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(year) = self.publication_year {
            book.publication_year = year;
        }
        if let Some(author_id) = self.author_id {
            book.author_id = author_id;
        }
    }
}

impl From<NewBook> for BookChanges {
    fn from(b: NewBook) -> Self {
        BookChanges {
            title: Some(b.title),
            publication_year: Some(b.publication_year),
            author_id: Some(b.author_id),
        }
    }
}
