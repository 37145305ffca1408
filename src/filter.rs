//! Declarative filter/search/order descriptions over books and posts.
//!
//! The same query is rendered to SQL by [`crate::sql`] and evaluated in process by
//! [`crate::store::MemoryStore`]; both must agree on the semantics here.

use crate::error::{AppError, FieldErrors};
use crate::model::{BookWithAuthor, PostView};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Upper bound on a client-supplied `limit`. Without `limit` a listing is unbounded.
pub const MAX_LIMIT: u32 = 1000;

/// Book columns a client may order by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookField {
    Id,
    Title,
    PublicationYear,
}

impl BookField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(BookField::Id),
            "title" => Some(BookField::Title),
            "publication_year" => Some(BookField::PublicationYear),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            BookField::Id => "id",
            BookField::Title => "title",
            BookField::PublicationYear => "publication_year",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderTerm {
    pub field: BookField,
    pub descending: bool,
}

/// Filter, search, ordering and pagination for the book list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    /// Exact author id.
    pub author: Option<i64>,
    /// Case-insensitive substring of the author's name.
    pub author_name: Option<String>,
    /// Each term must match title or author name.
    pub search: Vec<String>,
    pub ordering: Vec<OrderTerm>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl BookQuery {
    /// Parse list query parameters. Unknown parameters and unknown ordering fields are ignored.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, AppError> {
        let mut errors = FieldErrors::new();
        let mut q = BookQuery {
            title: non_empty(params, "title").map(str::to_string),
            author_name: non_empty(params, "author_name").map(str::to_string),
            ..Default::default()
        };
        if let Some(v) = non_empty(params, "publication_year") {
            match v.parse::<i32>() {
                Ok(n) => q.publication_year = Some(n),
                Err(_) => errors.add("publication_year", "Enter a number."),
            }
        }
        if let Some(v) = non_empty(params, "author") {
            match v.parse::<i64>() {
                Ok(n) => q.author = Some(n),
                Err(_) => errors.add("author", "Select a valid choice. That choice is not one of the available choices."),
            }
        }
        if let Some(v) = non_empty(params, "search").or_else(|| non_empty(params, "q")) {
            q.search = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = non_empty(params, "ordering") {
            q.ordering = parse_ordering(v);
        }
        q.limit = non_empty(params, "limit").and_then(|v| v.parse().ok());
        q.offset = non_empty(params, "offset").and_then(|v| v.parse().ok());
        errors.into_result()?;
        Ok(q)
    }

    /// `None` means every matching row.
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.map(|n| n.min(MAX_LIMIT))
    }

    pub fn effective_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    pub fn matches(&self, row: &BookWithAuthor) -> bool {
        let book = &row.book;
        if let Some(t) = &self.title {
            if !contains_ci(&book.title, t) {
                return false;
            }
        }
        if let Some(y) = self.publication_year {
            if book.publication_year != y {
                return false;
            }
        }
        if let Some(a) = self.author {
            if book.author_id != a {
                return false;
            }
        }
        if let Some(n) = &self.author_name {
            if !contains_ci(&row.author_name, n) {
                return false;
            }
        }
        self.search
            .iter()
            .all(|term| contains_ci(&book.title, term) || contains_ci(&row.author_name, term))
    }

    /// Requested ordering, then id ascending as the tie-break.
    pub fn compare(&self, a: &BookWithAuthor, b: &BookWithAuthor) -> Ordering {
        for term in &self.ordering {
            let ord = match term.field {
                BookField::Id => a.book.id.cmp(&b.book.id),
                BookField::Title => a.book.title.to_lowercase().cmp(&b.book.title.to_lowercase()),
                BookField::PublicationYear => a.book.publication_year.cmp(&b.book.publication_year),
            };
            let ord = if term.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.book.id.cmp(&b.book.id)
    }

    /// Filter, order and paginate an in-memory collection.
    pub fn apply(&self, rows: impl IntoIterator<Item = BookWithAuthor>) -> Vec<BookWithAuthor> {
        let mut out: Vec<_> = rows.into_iter().filter(|r| self.matches(r)).collect();
        out.sort_by(|a, b| self.compare(a, b));
        let rows = out.into_iter().skip(self.effective_offset() as usize);
        match self.effective_limit() {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        }
    }
}

fn parse_ordering(raw: &str) -> Vec<OrderTerm> {
    raw.split(',')
        .map(str::trim)
        .filter_map(|part| {
            let (descending, name) = match part.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, part),
            };
            BookField::parse(name).map(|field| OrderTerm { field, descending })
        })
        .collect()
}

pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Bookshelf search: title or author name. An empty query matches nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShelfSearch {
    pub q: String,
}

impl ShelfSearch {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        ShelfSearch {
            q: params.get("q").map(|s| s.trim().to_string()).unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn matches(&self, row: &BookWithAuthor) -> bool {
        !self.is_empty() && (contains_ci(&row.book.title, &self.q) || contains_ci(&row.author_name, &self.q))
    }
}

/// Blog search: title, content, or any tag name. An empty query matches nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostSearch {
    pub q: String,
}

impl PostSearch {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        PostSearch {
            q: params.get("q").map(|s| s.trim().to_string()).unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn matches(&self, post: &PostView) -> bool {
        if self.is_empty() {
            return false;
        }
        contains_ci(&post.post.title, &self.q)
            || contains_ci(&post.post.content, &self.q)
            || post.tags.iter().any(|t| contains_ci(&t.name, &self.q))
    }
}
