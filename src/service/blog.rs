//! Posts and comments with author-only edits.

use crate::auth::{require_owner, AuthUser};
use crate::error::AppError;
use crate::filter::PostSearch;
use crate::model::*;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Posts carrying one tag.
#[derive(Clone, Debug, Serialize)]
pub struct TaggedPosts {
    pub tag: Tag,
    pub posts: Vec<PostView>,
}

pub struct BlogService;

impl BlogService {
    async fn post_view(store: &dyn Store, id: i64) -> Result<PostView, AppError> {
        store
            .post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", id)))
    }

    pub async fn post_detail(store: &dyn Store, id: i64) -> Result<PostDetail, AppError> {
        let post = Self::post_view(store, id).await?;
        let comments = store.comments_for_post(id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn create_post(
        store: &dyn Store,
        user: &AuthUser,
        content: PostContent,
        now: DateTime<Utc>,
    ) -> Result<PostView, AppError> {
        let post = store.create_post(user.id(), &content, now).await?;
        tracing::info!(post_id = post.post.id, author_id = user.id(), "post created");
        Ok(post)
    }

    pub async fn update_post(
        store: &dyn Store,
        user: &AuthUser,
        id: i64,
        content: PostContent,
    ) -> Result<PostView, AppError> {
        let existing = Self::post_view(store, id).await?;
        require_owner(user, existing.post.author_id, "post")?;
        let post = store
            .update_post(id, &content)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", id)))?;
        tracing::info!(post_id = id, "post updated");
        Ok(post)
    }

    /// Removes the post with its comments.
    pub async fn delete_post(store: &dyn Store, user: &AuthUser, id: i64) -> Result<(), AppError> {
        let existing = Self::post_view(store, id).await?;
        require_owner(user, existing.post.author_id, "post")?;
        store.delete_post(id).await?;
        tracing::info!(post_id = id, "post deleted");
        Ok(())
    }

    pub async fn search(store: &dyn Store, search: &PostSearch) -> Result<Vec<PostView>, AppError> {
        store.search_posts(search).await
    }

    pub async fn tagged(store: &dyn Store, slug: &str) -> Result<TaggedPosts, AppError> {
        let tag = store
            .tag(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tag {}", slug)))?;
        let posts = store.posts_by_tag(slug).await?;
        Ok(TaggedPosts { tag, posts })
    }

    pub async fn create_comment(
        store: &dyn Store,
        user: &AuthUser,
        post_id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        Self::post_view(store, post_id).await?;
        let comment = store.create_comment(post_id, user.id(), content, now).await?;
        tracing::info!(comment_id = comment.id, post_id, "comment created");
        Ok(comment)
    }

    async fn owned_comment(store: &dyn Store, user: &AuthUser, id: i64) -> Result<Comment, AppError> {
        let comment = store
            .comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", id)))?;
        require_owner(user, comment.author_id, "comment")?;
        Ok(comment)
    }

    pub async fn update_comment(
        store: &dyn Store,
        user: &AuthUser,
        id: i64,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        Self::owned_comment(store, user, id).await?;
        let comment = store
            .update_comment(id, content, now)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", id)))?;
        tracing::info!(comment_id = id, "comment updated");
        Ok(comment)
    }

    /// Returns the post id the comment belonged to.
    pub async fn delete_comment(store: &dyn Store, user: &AuthUser, id: i64) -> Result<i64, AppError> {
        let comment = Self::owned_comment(store, user, id).await?;
        store.delete_comment(id).await?;
        tracing::info!(comment_id = id, post_id = comment.post_id, "comment deleted");
        Ok(comment.post_id)
    }
}
