//! Posts, tags, comments.

use super::PgStore;
use crate::error::AppError;
use crate::model::*;
use crate::sql::{select_posts, PostFilter};
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use std::collections::HashMap;

#[derive(sqlx::FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: Post,
    author_username: String,
}

const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at, updated_at";

/// Attach tags (ordered by name) to post rows with one extra query.
async fn with_tags(store: &PgStore, rows: Vec<PostRow>) -> Result<Vec<PostView>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = rows.iter().map(|r| r.post.id).collect();
    let sql = format!(
        "SELECT pt.post_id, t.id, t.name, t.slug FROM {} pt JOIN {} t ON t.id = pt.tag_id \
         WHERE pt.post_id = ANY($1) ORDER BY t.name",
        store.table("post_tags"),
        store.table("tags")
    );
    let tag_rows: Vec<(i64, i64, String, String)> = sqlx::query_as(&sql)
        .bind(&ids)
        .fetch_all(store.pool())
        .await?;
    let mut by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
    for (post_id, id, name, slug) in tag_rows {
        by_post.entry(post_id).or_default().push(Tag { id, name, slug });
    }
    Ok(rows
        .into_iter()
        .map(|r| PostView {
            tags: by_post.remove(&r.post.id).unwrap_or_default(),
            post: r.post,
            author_username: r.author_username,
        })
        .collect())
}

pub(super) async fn posts(store: &PgStore, filter: PostFilter<'_>) -> Result<Vec<PostView>, AppError> {
    let q = select_posts(&store.schema, filter);
    let rows: Vec<PostRow> = store.fetch_all_as(&q).await?;
    with_tags(store, rows).await
}

pub(super) async fn tag(store: &PgStore, slug: &str) -> Result<Option<Tag>, AppError> {
    let sql = format!("SELECT id, name, slug FROM {} WHERE slug = $1", store.table("tags"));
    Ok(sqlx::query_as::<_, Tag>(&sql)
        .bind(slug)
        .fetch_optional(store.pool())
        .await?)
}

/// Replace the post's tag links, creating tags by slug as needed. Runs inside the caller's transaction.
async fn set_tags(store: &PgStore, conn: &mut PgConnection, post_id: i64, names: &[String]) -> Result<(), AppError> {
    let clear = format!("DELETE FROM {} WHERE post_id = $1", store.table("post_tags"));
    sqlx::query(&clear).bind(post_id).execute(&mut *conn).await?;
    let upsert = format!(
        "INSERT INTO {} (name, slug) VALUES ($1, $2) ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug RETURNING id",
        store.table("tags")
    );
    let link = format!(
        "INSERT INTO {} (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        store.table("post_tags")
    );
    for name in names {
        let slug = slugify(name);
        if slug.is_empty() {
            continue;
        }
        let tag_id: i64 = sqlx::query_scalar(&upsert)
            .bind(name)
            .bind(&slug)
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query(&link).bind(post_id).bind(tag_id).execute(&mut *conn).await?;
    }
    Ok(())
}

pub(super) async fn create_post(
    store: &PgStore,
    author_id: i64,
    post: &PostContent,
    at: DateTime<Utc>,
) -> Result<PostView, AppError> {
    let sql = format!(
        "INSERT INTO {} (title, content, published_date, author_id) VALUES ($1, $2, $3, $4) RETURNING id",
        store.table("posts")
    );
    tracing::debug!(sql = %sql, author_id, "query (tx)");
    let mut tx = store.pool().begin().await?;
    let id: i64 = sqlx::query_scalar(&sql)
        .bind(&post.title)
        .bind(&post.content)
        .bind(at)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;
    set_tags(store, &mut tx, id, &post.tags).await?;
    tx.commit().await?;
    posts(store, PostFilter::Id(id))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal(format!("post {} vanished after insert", id)))
}

pub(super) async fn update_post(store: &PgStore, id: i64, post: &PostContent) -> Result<Option<PostView>, AppError> {
    let sql = format!(
        "UPDATE {} SET title = $2, content = $3 WHERE id = $1",
        store.table("posts")
    );
    tracing::debug!(sql = %sql, id, "query (tx)");
    let mut tx = store.pool().begin().await?;
    let res = sqlx::query(&sql)
        .bind(id)
        .bind(&post.title)
        .bind(&post.content)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Ok(None);
    }
    set_tags(store, &mut tx, id, &post.tags).await?;
    tx.commit().await?;
    Ok(posts(store, PostFilter::Id(id)).await?.into_iter().next())
}

pub(super) async fn create_comment(
    store: &PgStore,
    post_id: i64,
    author_id: i64,
    content: &str,
    at: DateTime<Utc>,
) -> Result<Comment, AppError> {
    let sql = format!(
        "INSERT INTO {} (post_id, author_id, content, created_at, updated_at) VALUES ($1, $2, $3, $4, $4) RETURNING {}",
        store.table("comments"),
        COMMENT_COLUMNS
    );
    tracing::debug!(sql = %sql, post_id, author_id, "query");
    sqlx::query_as::<_, Comment>(&sql)
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .bind(at)
        .fetch_one(store.pool())
        .await
        .map_err(|e| {
            let fk = e
                .as_database_error()
                .map(|d| d.is_foreign_key_violation())
                .unwrap_or(false);
            if fk {
                AppError::NotFound(format!("post {}", post_id))
            } else {
                AppError::Db(e)
            }
        })
}

pub(super) async fn comment(store: &PgStore, id: i64) -> Result<Option<Comment>, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", COMMENT_COLUMNS, store.table("comments"));
    Ok(sqlx::query_as::<_, Comment>(&sql)
        .bind(id)
        .fetch_optional(store.pool())
        .await?)
}

pub(super) async fn comments_for_post(store: &PgStore, post_id: i64) -> Result<Vec<CommentView>, AppError> {
    let sql = format!(
        "SELECT c.id, c.post_id, c.author_id, c.content, c.created_at, c.updated_at, u.username AS author_username \
         FROM {} c JOIN {} u ON u.id = c.author_id WHERE c.post_id = $1 ORDER BY c.created_at DESC, c.id DESC",
        store.table("comments"),
        store.table("users")
    );
    Ok(sqlx::query_as::<_, CommentView>(&sql)
        .bind(post_id)
        .fetch_all(store.pool())
        .await?)
}

pub(super) async fn update_comment(
    store: &PgStore,
    id: i64,
    content: &str,
    at: DateTime<Utc>,
) -> Result<Option<Comment>, AppError> {
    let sql = format!(
        "UPDATE {} SET content = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
        store.table("comments"),
        COMMENT_COLUMNS
    );
    tracing::debug!(sql = %sql, id, "query");
    Ok(sqlx::query_as::<_, Comment>(&sql)
        .bind(id)
        .bind(content)
        .bind(at)
        .fetch_optional(store.pool())
        .await?)
}
