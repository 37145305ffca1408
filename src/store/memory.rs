//! In-process store: every table behind one mutex. Used by tests and when no database is configured.

use super::Store;
use crate::error::AppError;
use crate::filter::{BookQuery, PostSearch, ShelfSearch};
use crate::model::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    profiles: HashMap<i64, Role>,
    grants: HashSet<(i64, Permission)>,
    sessions: HashMap<String, Session>,
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    libraries: BTreeMap<i64, Library>,
    /// (library_id, book_id)
    library_books: BTreeSet<(i64, i64)>,
    librarians: BTreeMap<i64, Librarian>,
    posts: BTreeMap<i64, Post>,
    tags: BTreeMap<i64, Tag>,
    /// (post_id, tag_id)
    post_tags: BTreeSet<(i64, i64)>,
    comments: BTreeMap<i64, Comment>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn with_author(&self, book: &Book) -> BookWithAuthor {
        BookWithAuthor {
            book: book.clone(),
            author_name: self
                .authors
                .get(&book.author_id)
                .map(|a| a.name.clone())
                .unwrap_or_default(),
        }
    }

    fn all_books(&self) -> Vec<BookWithAuthor> {
        self.books.values().map(|b| self.with_author(b)).collect()
    }

    fn detach_book(&mut self, book_id: i64) {
        self.library_books.retain(|(_, b)| *b != book_id);
    }

    fn post_view(&self, post: &Post) -> PostView {
        let mut tags: Vec<Tag> = self
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post.id)
            .filter_map(|(_, t)| self.tags.get(t).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        PostView {
            post: post.clone(),
            author_username: self
                .users
                .get(&post.author_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            tags,
        }
    }

    /// Newest first; id descending breaks ties between equal timestamps.
    fn posts_where(&self, pred: impl Fn(&PostView) -> bool) -> Vec<PostView> {
        let mut out: Vec<PostView> = self.posts.values().map(|p| self.post_view(p)).filter(|v| pred(v)).collect();
        out.sort_by(|a, b| {
            b.post
                .published_date
                .cmp(&a.post.published_date)
                .then(b.post.id.cmp(&a.post.id))
        });
        out
    }

    fn set_post_tags(&mut self, post_id: i64, names: &[String]) {
        self.post_tags.retain(|(p, _)| *p != post_id);
        for name in names {
            let slug = slugify(name);
            if slug.is_empty() {
                continue;
            }
            let existing = self.tags.values().find(|t| t.slug == slug).map(|t| t.id);
            let tag_id = match existing {
                Some(id) => id,
                None => {
                    let id = self.next_id("tags");
                    self.tags.insert(
                        id,
                        Tag {
                            id,
                            name: name.clone(),
                            slug,
                        },
                    );
                    id
                }
            };
            self.post_tags.insert((post_id, tag_id));
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut t = self.lock()?;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!("username '{}' is taken", user.username)));
        }
        let id = t.next_id("users");
        let created = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            is_superuser: user.is_superuser,
            date_joined: Utc::now(),
        };
        t.users.insert(id, created.clone());
        Ok(created)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError> {
        let mut t = self.lock()?;
        Ok(t.users.get_mut(&id).map(|u| {
            changes.apply(u);
            u.clone()
        }))
    }

    async fn profile(&self, user_id: i64) -> Result<Option<UserProfile>, AppError> {
        Ok(self
            .lock()?
            .profiles
            .get(&user_id)
            .map(|role| UserProfile { user_id, role: *role }))
    }

    async fn ensure_profile(&self, user_id: i64) -> Result<UserProfile, AppError> {
        let mut t = self.lock()?;
        if !t.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        let role = *t.profiles.entry(user_id).or_default();
        Ok(UserProfile { user_id, role })
    }

    async fn set_role(&self, user_id: i64, role: Role) -> Result<UserProfile, AppError> {
        let mut t = self.lock()?;
        if !t.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        t.profiles.insert(user_id, role);
        Ok(UserProfile { user_id, role })
    }

    async fn permissions(&self, user_id: i64) -> Result<Vec<Permission>, AppError> {
        let t = self.lock()?;
        Ok(Permission::ALL
            .iter()
            .copied()
            .filter(|p| t.grants.contains(&(user_id, *p)))
            .collect())
    }

    async fn grant_permission(&self, user_id: i64, permission: Permission) -> Result<(), AppError> {
        let mut t = self.lock()?;
        if !t.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        t.grants.insert((user_id, permission));
        Ok(())
    }

    async fn revoke_permission(&self, user_id: i64, permission: Permission) -> Result<bool, AppError> {
        Ok(self.lock()?.grants.remove(&(user_id, permission)))
    }

    async fn create_session(&self, session: Session) -> Result<(), AppError> {
        self.lock()?.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError> {
        let t = self.lock()?;
        Ok(t.sessions
            .get(token)
            .filter(|s| !s.is_expired(now))
            .and_then(|s| t.users.get(&s.user_id).cloned()))
    }

    async fn delete_session(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.sessions.remove(token).is_some())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let mut t = self.lock()?;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - t.sessions.len()) as u64)
    }

    async fn create_author(&self, name: &str) -> Result<Author, AppError> {
        let mut t = self.lock()?;
        let id = t.next_id("authors");
        let author = Author {
            id,
            name: name.to_string(),
        };
        t.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn author(&self, id: i64) -> Result<Option<Author>, AppError> {
        Ok(self.lock()?.authors.get(&id).cloned())
    }

    async fn list_authors(&self) -> Result<Vec<Author>, AppError> {
        Ok(self.lock()?.authors.values().cloned().collect())
    }

    async fn delete_author(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.lock()?;
        if t.authors.remove(&id).is_none() {
            return Ok(false);
        }
        let doomed: Vec<i64> = t.books.values().filter(|b| b.author_id == id).map(|b| b.id).collect();
        for book_id in doomed {
            t.books.remove(&book_id);
            t.detach_book(book_id);
        }
        Ok(true)
    }

    async fn create_book(&self, book: NewBook) -> Result<Book, AppError> {
        let mut t = self.lock()?;
        if !t.authors.contains_key(&book.author_id) {
            return Err(AppError::field(
                "author",
                format!("Invalid pk \"{}\" - object does not exist.", book.author_id),
            ));
        }
        let id = t.next_id("books");
        let created = Book {
            id,
            title: book.title,
            publication_year: book.publication_year,
            author_id: book.author_id,
        };
        t.books.insert(id, created.clone());
        Ok(created)
    }

    async fn book(&self, id: i64) -> Result<Option<BookWithAuthor>, AppError> {
        let t = self.lock()?;
        Ok(t.books.get(&id).map(|b| t.with_author(b)))
    }

    async fn list_books(&self, query: &BookQuery) -> Result<Vec<BookWithAuthor>, AppError> {
        let t = self.lock()?;
        Ok(query.apply(t.all_books()))
    }

    async fn search_books(&self, search: &ShelfSearch) -> Result<Vec<BookWithAuthor>, AppError> {
        let t = self.lock()?;
        Ok(t.all_books().into_iter().filter(|b| search.matches(b)).collect())
    }

    async fn books_by_author(&self, author_id: i64) -> Result<Vec<Book>, AppError> {
        Ok(self
            .lock()?
            .books
            .values()
            .filter(|b| b.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn update_book(&self, id: i64, changes: &BookChanges) -> Result<Option<Book>, AppError> {
        let mut t = self.lock()?;
        if let Some(author_id) = changes.author_id {
            if !t.authors.contains_key(&author_id) {
                return Err(AppError::field(
                    "author",
                    format!("Invalid pk \"{}\" - object does not exist.", author_id),
                ));
            }
        }
        Ok(t.books.get_mut(&id).map(|b| {
            changes.apply(b);
            b.clone()
        }))
    }

    async fn delete_book(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.lock()?;
        let existed = t.books.remove(&id).is_some();
        t.detach_book(id);
        Ok(existed)
    }

    async fn create_library(&self, name: &str) -> Result<Library, AppError> {
        let mut t = self.lock()?;
        let id = t.next_id("libraries");
        let library = Library {
            id,
            name: name.to_string(),
        };
        t.libraries.insert(id, library.clone());
        Ok(library)
    }

    async fn library(&self, id: i64) -> Result<Option<Library>, AppError> {
        Ok(self.lock()?.libraries.get(&id).cloned())
    }

    async fn list_libraries(&self) -> Result<Vec<Library>, AppError> {
        Ok(self.lock()?.libraries.values().cloned().collect())
    }

    async fn delete_library(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.lock()?;
        if t.libraries.remove(&id).is_none() {
            return Ok(false);
        }
        t.library_books.retain(|(l, _)| *l != id);
        t.librarians.remove(&id);
        Ok(true)
    }

    async fn add_library_book(&self, library_id: i64, book_id: i64) -> Result<(), AppError> {
        let mut t = self.lock()?;
        if !t.libraries.contains_key(&library_id) {
            return Err(AppError::NotFound(format!("library {}", library_id)));
        }
        if !t.books.contains_key(&book_id) {
            return Err(AppError::field(
                "book",
                format!("Invalid pk \"{}\" - object does not exist.", book_id),
            ));
        }
        t.library_books.insert((library_id, book_id));
        Ok(())
    }

    async fn remove_library_book(&self, library_id: i64, book_id: i64) -> Result<bool, AppError> {
        Ok(self.lock()?.library_books.remove(&(library_id, book_id)))
    }

    async fn library_books(&self, library_id: i64) -> Result<Vec<BookWithAuthor>, AppError> {
        let t = self.lock()?;
        Ok(t.library_books
            .iter()
            .filter(|(l, _)| *l == library_id)
            .filter_map(|(_, b)| t.books.get(b).map(|book| t.with_author(book)))
            .collect())
    }

    async fn create_librarian(&self, library_id: i64, name: &str) -> Result<Librarian, AppError> {
        let mut t = self.lock()?;
        if !t.libraries.contains_key(&library_id) {
            return Err(AppError::NotFound(format!("library {}", library_id)));
        }
        if t.librarians.contains_key(&library_id) {
            return Err(AppError::Conflict(format!("library {} already has a librarian", library_id)));
        }
        let librarian = Librarian {
            library_id,
            name: name.to_string(),
        };
        t.librarians.insert(library_id, librarian.clone());
        Ok(librarian)
    }

    async fn librarian(&self, library_id: i64) -> Result<Option<Librarian>, AppError> {
        Ok(self.lock()?.librarians.get(&library_id).cloned())
    }

    async fn create_post(&self, author_id: i64, post: &PostContent, at: DateTime<Utc>) -> Result<PostView, AppError> {
        let mut t = self.lock()?;
        let id = t.next_id("posts");
        let created = Post {
            id,
            title: post.title.clone(),
            content: post.content.clone(),
            published_date: at,
            author_id,
        };
        t.posts.insert(id, created.clone());
        t.set_post_tags(id, &post.tags);
        Ok(t.post_view(&created))
    }

    async fn post(&self, id: i64) -> Result<Option<PostView>, AppError> {
        let t = self.lock()?;
        Ok(t.posts.get(&id).map(|p| t.post_view(p)))
    }

    async fn list_posts(&self) -> Result<Vec<PostView>, AppError> {
        Ok(self.lock()?.posts_where(|_| true))
    }

    async fn search_posts(&self, search: &PostSearch) -> Result<Vec<PostView>, AppError> {
        Ok(self.lock()?.posts_where(|p| search.matches(p)))
    }

    async fn posts_by_tag(&self, slug: &str) -> Result<Vec<PostView>, AppError> {
        Ok(self.lock()?.posts_where(|p| p.tags.iter().any(|t| t.slug == slug)))
    }

    async fn tag(&self, slug: &str) -> Result<Option<Tag>, AppError> {
        Ok(self.lock()?.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn update_post(&self, id: i64, post: &PostContent) -> Result<Option<PostView>, AppError> {
        let mut t = self.lock()?;
        let Some(existing) = t.posts.get_mut(&id) else {
            return Ok(None);
        };
        existing.title = post.title.clone();
        existing.content = post.content.clone();
        let updated = existing.clone();
        t.set_post_tags(id, &post.tags);
        Ok(Some(t.post_view(&updated)))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.lock()?;
        if t.posts.remove(&id).is_none() {
            return Ok(false);
        }
        t.post_tags.retain(|(p, _)| *p != id);
        t.comments.retain(|_, c| c.post_id != id);
        Ok(true)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, content: &str, at: DateTime<Utc>) -> Result<Comment, AppError> {
        let mut t = self.lock()?;
        if !t.posts.contains_key(&post_id) {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }
        let id = t.next_id("comments");
        let comment = Comment {
            id,
            post_id,
            author_id,
            content: content.to_string(),
            created_at: at,
            updated_at: at,
        };
        t.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn comment(&self, id: i64) -> Result<Option<Comment>, AppError> {
        Ok(self.lock()?.comments.get(&id).cloned())
    }

    async fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, AppError> {
        let t = self.lock()?;
        let mut out: Vec<CommentView> = t
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| CommentView {
                comment: c.clone(),
                author_username: t
                    .users
                    .get(&c.author_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect();
        out.sort_by(|a, b| {
            b.comment
                .created_at
                .cmp(&a.comment.created_at)
                .then(b.comment.id.cmp(&a.comment.id))
        });
        Ok(out)
    }

    async fn update_comment(&self, id: i64, content: &str, at: DateTime<Utc>) -> Result<Option<Comment>, AppError> {
        let mut t = self.lock()?;
        Ok(t.comments.get_mut(&id).map(|c| {
            c.content = content.to_string();
            c.updated_at = at;
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.lock()?.comments.remove(&id).is_some())
    }
}
