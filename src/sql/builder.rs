//! Builds parameterized SELECTs for the filtered book and post listings.

use super::BindValue;
use crate::filter::{BookField, BookQuery, PostSearch, ShelfSearch};

/// Quote identifier for PostgreSQL (safe: only from config and constants).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// `%term%` for ILIKE with `\`, `%` and `_` escaped.
pub fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

const BOOK_COLUMNS: &str = "b.\"id\", b.\"title\", b.\"publication_year\", b.\"author_id\", a.\"name\" AS \"author_name\"";

fn book_from(schema: &str) -> String {
    format!(
        "{} b JOIN {} a ON a.\"id\" = b.\"author_id\"",
        qualified_table(schema, "books"),
        qualified_table(schema, "authors")
    )
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// Book list with filters, search terms, ordering (id tie-break) and LIMIT/OFFSET.
pub fn select_books(schema: &str, query: &BookQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();

    if let Some(title) = &query.title {
        let n = q.push_param(BindValue::Text(like_pattern(title)));
        where_parts.push(format!("b.\"title\" ILIKE ${}", n));
    }
    if let Some(year) = query.publication_year {
        let n = q.push_param(BindValue::I32(year));
        where_parts.push(format!("b.\"publication_year\" = ${}", n));
    }
    if let Some(author) = query.author {
        let n = q.push_param(BindValue::I64(author));
        where_parts.push(format!("b.\"author_id\" = ${}", n));
    }
    if let Some(name) = &query.author_name {
        let n = q.push_param(BindValue::Text(like_pattern(name)));
        where_parts.push(format!("a.\"name\" ILIKE ${}", n));
    }
    for term in &query.search {
        let n = q.push_param(BindValue::Text(like_pattern(term)));
        where_parts.push(format!("(b.\"title\" ILIKE ${n} OR a.\"name\" ILIKE ${n})", n = n));
    }

    let mut order: Vec<String> = query
        .ordering
        .iter()
        .map(|t| {
            let column = format!("b.{}", quoted(t.field.column()));
            let key = match t.field {
                BookField::Title => format!("LOWER({})", column),
                _ => column,
            };
            format!("{} {}", key, if t.descending { "DESC" } else { "ASC" })
        })
        .collect();
    order.push("b.\"id\" ASC".to_string());

    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        BOOK_COLUMNS,
        book_from(schema),
        where_clause(&where_parts),
        order.join(", ")
    );
    if let Some(limit) = query.effective_limit() {
        q.sql.push_str(&format!(" LIMIT {}", limit));
    }
    if query.effective_offset() > 0 {
        q.sql.push_str(&format!(" OFFSET {}", query.effective_offset()));
    }
    q
}

/// Books whose title or author name contains the query.
pub fn select_books_matching(schema: &str, search: &ShelfSearch) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::Text(like_pattern(&search.q)));
    q.sql = format!(
        "SELECT {} FROM {} WHERE b.\"title\" ILIKE ${n} OR a.\"name\" ILIKE ${n} ORDER BY b.\"id\"",
        BOOK_COLUMNS,
        book_from(schema),
        n = n
    );
    q
}

/// Single book by id, joined with its author.
pub fn select_book_by_id(schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::I64(id));
    q.sql = format!("SELECT {} FROM {} WHERE b.\"id\" = ${}", BOOK_COLUMNS, book_from(schema), n);
    q
}

/// Books held by one library, ordered by book id.
pub fn select_library_books(schema: &str, library_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(BindValue::I64(library_id));
    q.sql = format!(
        "SELECT {} FROM {} JOIN {} lb ON lb.\"book_id\" = b.\"id\" WHERE lb.\"library_id\" = ${} ORDER BY b.\"id\"",
        BOOK_COLUMNS,
        book_from(schema),
        qualified_table(schema, "library_books"),
        n
    );
    q
}

/// Which posts a post listing selects.
pub enum PostFilter<'a> {
    All,
    Id(i64),
    Search(&'a PostSearch),
    TagSlug(&'a str),
}

/// Posts joined with their author's username, newest first.
pub fn select_posts(schema: &str, filter: PostFilter<'_>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let tag_exists = |q: &mut QueryBuf, predicate: &str, value: BindValue| {
        let n = q.push_param(value);
        format!(
            "EXISTS (SELECT 1 FROM {} pt JOIN {} t ON t.\"id\" = pt.\"tag_id\" WHERE pt.\"post_id\" = p.\"id\" AND t.{} ${})",
            qualified_table(schema, "post_tags"),
            qualified_table(schema, "tags"),
            predicate,
            n
        )
    };
    let where_sql = match filter {
        PostFilter::All => String::new(),
        PostFilter::Id(id) => {
            let n = q.push_param(BindValue::I64(id));
            format!(" WHERE p.\"id\" = ${}", n)
        }
        PostFilter::Search(search) => {
            let pattern = like_pattern(&search.q);
            let n = q.push_param(BindValue::Text(pattern.clone()));
            let tags = tag_exists(&mut q, "\"name\" ILIKE", BindValue::Text(pattern));
            format!(
                " WHERE p.\"title\" ILIKE ${n} OR p.\"content\" ILIKE ${n} OR {tags}",
                n = n,
                tags = tags
            )
        }
        PostFilter::TagSlug(slug) => {
            let tags = tag_exists(&mut q, "\"slug\" =", BindValue::Text(slug.to_string()));
            format!(" WHERE {}", tags)
        }
    };
    q.sql = format!(
        "SELECT p.\"id\", p.\"title\", p.\"content\", p.\"published_date\", p.\"author_id\", u.\"username\" AS \"author_username\" \
         FROM {} p JOIN {} u ON u.\"id\" = p.\"author_id\"{} ORDER BY p.\"published_date\" DESC, p.\"id\" DESC",
        qualified_table(schema, "posts"),
        qualified_table(schema, "users"),
        where_sql
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BookField, OrderTerm};

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn book_query_binds_in_order() {
        let query = BookQuery {
            title: Some("farm".into()),
            publication_year: Some(1945),
            search: vec!["orwell".into()],
            ordering: vec![OrderTerm {
                field: BookField::PublicationYear,
                descending: true,
            }],
            ..Default::default()
        };
        let q = select_books("shelf", &query);
        assert_eq!(
            q.params,
            vec![
                BindValue::Text("%farm%".into()),
                BindValue::I32(1945),
                BindValue::Text("%orwell%".into()),
            ]
        );
        assert!(q.sql.contains("b.\"title\" ILIKE $1"));
        assert!(q.sql.contains("b.\"publication_year\" = $2"));
        assert!(q.sql.contains("(b.\"title\" ILIKE $3 OR a.\"name\" ILIKE $3)"));
        assert!(q.sql.ends_with("ORDER BY b.\"publication_year\" DESC, b.\"id\" ASC"));
        assert!(q.sql.contains("\"shelf\".\"books\""));
    }

    #[test]
    fn unfiltered_list_has_no_where() {
        let q = select_books("shelf", &BookQuery::default());
        assert!(!q.sql.contains("WHERE"));
        assert!(!q.sql.contains("LIMIT"));
        assert!(!q.sql.contains("OFFSET"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn explicit_pagination_and_title_ordering() {
        let query = BookQuery {
            ordering: vec![OrderTerm {
                field: BookField::Title,
                descending: false,
            }],
            limit: Some(20),
            offset: Some(40),
            ..Default::default()
        };
        let q = select_books("shelf", &query);
        assert!(q.sql.ends_with("ORDER BY LOWER(b.\"title\") ASC, b.\"id\" ASC LIMIT 20 OFFSET 40"));
    }

    #[test]
    fn post_search_checks_tags() {
        let search = PostSearch { q: "rust".into() };
        let q = select_posts("shelf", PostFilter::Search(&search));
        assert_eq!(q.params.len(), 2);
        assert!(q.sql.contains("t.\"name\" ILIKE $2"));
        assert!(q.sql.ends_with("ORDER BY p.\"published_date\" DESC, p.\"id\" DESC"));
    }
}
