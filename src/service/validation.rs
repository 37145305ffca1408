//! Request forms: raw JSON bodies in, validated records or per-field errors out.

use crate::error::{AppError, FieldErrors};
use crate::model::{slugify, BookChanges, NewBook, Permission, PostContent, Role, UserChanges};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub const REQUIRED: &str = "This field is required.";
pub const TITLE_MAX: usize = 200;
pub const NAME_MAX: usize = 100;
pub const USERNAME_MAX: usize = 150;
/// Applies to both the tag name and its slug.
pub const TAG_MAX: usize = 100;
pub const FEEDBACK_MAX: usize = 500;
pub const PASSWORD_MIN: usize = 8;
pub const SHELF_YEAR_RANGE: std::ops::RangeInclusive<i64> = 1000..=2100;

pub const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

fn pattern(re: &str) -> Result<Regex, AppError> {
    Regex::new(re).map_err(|e| AppError::Internal(format!("invalid pattern {}: {}", re, e)))
}

pub fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Field reader that records every problem instead of stopping at the first.
struct Fields {
    map: Map<String, Value>,
    errors: FieldErrors,
}

impl Fields {
    fn new(body: Value) -> Result<Self, AppError> {
        Ok(Fields {
            map: body_to_map(body)?,
            errors: FieldErrors::new(),
        })
    }

    fn present(&self, name: &str) -> bool {
        !matches!(self.map.get(name), None | Some(Value::Null))
    }

    /// Trimmed string. Numbers are accepted as their text.
    fn text(&mut self, name: &str, required: bool, max: Option<usize>) -> Option<String> {
        let raw = match self.map.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.trim().to_string()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                self.errors.add(name, "Not a valid string.");
                return None;
            }
        };
        match raw {
            None => {
                if required {
                    self.errors.add(name, REQUIRED);
                }
                None
            }
            Some(s) if s.is_empty() => {
                if required {
                    self.errors.add(name, REQUIRED);
                    None
                } else {
                    Some(s)
                }
            }
            Some(s) => {
                let len = s.chars().count();
                match max {
                    Some(max) if len > max => {
                        self.errors.add(
                            name,
                            format!("Ensure this field has at most {} characters (it has {}).", max, len),
                        );
                        None
                    }
                    _ => Some(s),
                }
            }
        }
    }

    /// Raw password text; never trimmed.
    fn secret(&mut self, name: &str) -> Option<String> {
        match self.map.get(name) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => {
                self.errors.add(name, REQUIRED);
                None
            }
        }
    }

    /// Integer from a JSON number or a numeric string.
    fn int(&mut self, name: &str, required: bool) -> Option<i64> {
        let parsed = match self.map.get(name) {
            None | Some(Value::Null) => {
                if required {
                    self.errors.add(name, REQUIRED);
                }
                return None;
            }
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) if s.trim().is_empty() => {
                if required {
                    self.errors.add(name, REQUIRED);
                }
                return None;
            }
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
        };
        if parsed.is_none() {
            self.errors.add(name, "Enter a whole number.");
        }
        parsed
    }

    fn email(&mut self, name: &str, required: bool) -> Result<Option<String>, AppError> {
        let Some(value) = self.text(name, required, Some(254)) else {
            return Ok(None);
        };
        if value.is_empty() || pattern(EMAIL_PATTERN)?.is_match(&value) {
            Ok(Some(value))
        } else {
            self.errors.add(name, "Enter a valid email address.");
            Ok(None)
        }
    }

    fn finish(self) -> Result<(), AppError> {
        self.errors.into_result()
    }
}

fn future_year_message(current_year: i32) -> String {
    format!(
        "Publication year cannot be in the future. Current year is {}.",
        current_year
    )
}

fn year_in_past(fields: &mut Fields, year: i64, current_year: i32) -> Option<i32> {
    if year > current_year as i64 {
        fields.errors.add("publication_year", future_year_message(current_year));
        return None;
    }
    match i32::try_from(year) {
        Ok(y) => Some(y),
        Err(_) => {
            fields.errors.add("publication_year", "Enter a whole number.");
            None
        }
    }
}

/// Book create/replace form shared by the API and the relationship app.
pub struct BookForm;

impl BookForm {
    pub fn validate(body: Value, current_year: i32) -> Result<NewBook, AppError> {
        let mut f = Fields::new(body)?;
        let title = f.text("title", true, Some(TITLE_MAX));
        let year = f
            .int("publication_year", true)
            .and_then(|y| year_in_past(&mut f, y, current_year));
        let author_id = f.int("author", true);
        f.finish()?;
        match (title, year, author_id) {
            (Some(title), Some(publication_year), Some(author_id)) => Ok(NewBook {
                title,
                publication_year,
                author_id,
            }),
            _ => Err(AppError::Internal("book form passed with missing fields".into())),
        }
    }

    /// PATCH: only the fields present are checked and applied.
    pub fn validate_partial(body: Value, current_year: i32) -> Result<BookChanges, AppError> {
        let mut f = Fields::new(body)?;
        let title = if f.present("title") {
            f.text("title", true, Some(TITLE_MAX))
        } else {
            None
        };
        let publication_year = if f.present("publication_year") {
            f.int("publication_year", true)
                .and_then(|y| year_in_past(&mut f, y, current_year))
        } else {
            None
        };
        let author_id = if f.present("author") { f.int("author", true) } else { None };
        f.finish()?;
        Ok(BookChanges {
            title,
            publication_year,
            author_id,
        })
    }
}

/// Bookshelf add/edit form: the book form plus the year widget bounds.
pub struct ShelfBookForm;

impl ShelfBookForm {
    pub fn validate(body: Value, current_year: i32) -> Result<NewBook, AppError> {
        let mut f = Fields::new(body)?;
        let title = f.text("title", true, Some(TITLE_MAX));
        let author_id = f.int("author", true);
        let year = match f.int("publication_year", true) {
            Some(y) if y < *SHELF_YEAR_RANGE.start() => {
                f.errors.add(
                    "publication_year",
                    format!("Ensure this value is greater than or equal to {}.", SHELF_YEAR_RANGE.start()),
                );
                None
            }
            Some(y) if y > *SHELF_YEAR_RANGE.end() => {
                f.errors.add(
                    "publication_year",
                    format!("Ensure this value is less than or equal to {}.", SHELF_YEAR_RANGE.end()),
                );
                None
            }
            Some(y) => year_in_past(&mut f, y, current_year),
            None => None,
        };
        f.finish()?;
        match (title, year, author_id) {
            (Some(title), Some(publication_year), Some(author_id)) => Ok(NewBook {
                title,
                publication_year,
                author_id,
            }),
            _ => Err(AppError::Internal("shelf form passed with missing fields".into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Feedback {
    pub user_feedback: String,
    pub rating: i32,
}

pub struct FeedbackForm;

impl FeedbackForm {
    pub fn validate(body: Value) -> Result<Feedback, AppError> {
        let mut f = Fields::new(body)?;
        let user_feedback = f.text("user_feedback", true, Some(FEEDBACK_MAX));
        let rating = match f.int("rating", true) {
            Some(r) if (1..=5).contains(&r) => Some(r as i32),
            Some(_) => {
                f.errors.add("rating", "Ensure this value is between 1 and 5.");
                None
            }
            None => None,
        };
        f.finish()?;
        match (user_feedback, rating) {
            (Some(user_feedback), Some(rating)) => Ok(Feedback { user_feedback, rating }),
            _ => Err(AppError::Internal("feedback form passed with missing fields".into())),
        }
    }
}

/// Single `name` field: authors, libraries, librarians.
pub struct NameForm;

impl NameForm {
    pub fn validate(body: Value) -> Result<String, AppError> {
        let mut f = Fields::new(body)?;
        let name = f.text("name", true, Some(NAME_MAX));
        f.finish()?;
        name.ok_or_else(|| AppError::field("name", REQUIRED))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

pub struct RegisterForm;

impl RegisterForm {
    pub fn validate(body: Value) -> Result<Registration, AppError> {
        let mut f = Fields::new(body)?;
        let username_re = pattern(USERNAME_PATTERN)?;
        let username = f.text("username", true, Some(USERNAME_MAX)).and_then(|u| {
            if username_re.is_match(&u) {
                Some(u)
            } else {
                f.errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
                None
            }
        });
        let email = f.email("email", true)?;
        let first_name = f.text("first_name", false, Some(USERNAME_MAX)).unwrap_or_default();
        let last_name = f.text("last_name", false, Some(USERNAME_MAX)).unwrap_or_default();
        let password1 = f.secret("password1");
        let password2 = f.secret("password2");
        let password = match (password1, password2) {
            (Some(p1), Some(p2)) if p1 != p2 => {
                f.errors.add("password2", "The two password fields didn't match.");
                None
            }
            (Some(p), Some(_)) => {
                let mut ok = true;
                if p.chars().count() < PASSWORD_MIN {
                    f.errors.add(
                        "password2",
                        format!("This password is too short. It must contain at least {} characters.", PASSWORD_MIN),
                    );
                    ok = false;
                }
                if p.chars().all(|c| c.is_ascii_digit()) {
                    f.errors.add("password2", "This password is entirely numeric.");
                    ok = false;
                }
                ok.then_some(p)
            }
            _ => None,
        };
        f.finish()?;
        match (username, email, password) {
            (Some(username), Some(email), Some(password)) => Ok(Registration {
                username,
                email,
                first_name,
                last_name,
                password,
            }),
            _ => Err(AppError::Internal("registration form passed with missing fields".into())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub struct LoginForm;

impl LoginForm {
    pub fn validate(body: Value) -> Result<Credentials, AppError> {
        let mut f = Fields::new(body)?;
        let username = f.text("username", true, Some(USERNAME_MAX));
        let password = f.secret("password");
        f.finish()?;
        match (username, password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(AppError::Internal("login form passed with missing fields".into())),
        }
    }
}

pub struct ProfileForm;

impl ProfileForm {
    pub fn validate(body: Value) -> Result<UserChanges, AppError> {
        let mut f = Fields::new(body)?;
        let email = if f.present("email") { f.email("email", false)? } else { None };
        let first_name = f.text("first_name", false, Some(USERNAME_MAX));
        let last_name = f.text("last_name", false, Some(USERNAME_MAX));
        f.finish()?;
        Ok(UserChanges {
            email,
            first_name,
            last_name,
        })
    }
}

/// Trim, split on commas, drop blanks and names whose slug was already seen.
pub fn normalize_tags<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|name| {
            let slug = slugify(name);
            !slug.is_empty() && seen.insert(slug)
        })
        .map(str::to_string)
        .collect()
}

pub struct PostForm;

impl PostForm {
    pub fn validate(body: Value) -> Result<PostContent, AppError> {
        let mut f = Fields::new(body)?;
        let title = f.text("title", true, Some(TITLE_MAX));
        let content = f.text("content", true, None);
        let tags = match f.map.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) => normalize_tags([s.as_str()]),
            Some(Value::Array(items)) if items.iter().all(Value::is_string) => {
                normalize_tags(items.iter().filter_map(Value::as_str))
            }
            Some(_) => {
                f.errors.add("tags", "Enter a list of tag names.");
                Vec::new()
            }
        };
        if tags
            .iter()
            .any(|name| name.chars().count() > TAG_MAX || slugify(name).chars().count() > TAG_MAX)
        {
            f.errors.add("tags", format!("Ensure each tag has at most {} characters.", TAG_MAX));
        }
        f.finish()?;
        match (title, content) {
            (Some(title), Some(content)) => Ok(PostContent { title, content, tags }),
            _ => Err(AppError::Internal("post form passed with missing fields".into())),
        }
    }
}

pub struct CommentForm;

impl CommentForm {
    pub fn validate(body: Value) -> Result<String, AppError> {
        let mut f = Fields::new(body)?;
        let content = f.text("content", true, None);
        f.finish()?;
        content.ok_or_else(|| AppError::field("content", REQUIRED))
    }
}

pub struct RoleForm;

impl RoleForm {
    pub fn validate(body: Value) -> Result<Role, AppError> {
        let mut f = Fields::new(body)?;
        let role = f.text("role", true, None);
        f.finish()?;
        role.ok_or_else(|| AppError::field("role", REQUIRED))?.parse()
    }
}

pub struct PermissionForm;

impl PermissionForm {
    pub fn validate(body: Value) -> Result<Permission, AppError> {
        let mut f = Fields::new(body)?;
        let codename = f.text("codename", true, None);
        f.finish()?;
        codename.ok_or_else(|| AppError::field("codename", REQUIRED))?.parse()
    }
}

/// `{"book": <id>}` for attaching a book to a library.
pub struct LibraryBookForm;

impl LibraryBookForm {
    pub fn validate(body: Value) -> Result<i64, AppError> {
        let mut f = Fields::new(body)?;
        let book = f.int("book", true);
        f.finish()?;
        book.ok_or_else(|| AppError::field("book", REQUIRED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation(f) => f,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn book_form_accepts_strings_for_numbers() {
        let book = BookForm::validate(json!({"title": " 1984 ", "publication_year": "1949", "author": 2}), 2026).unwrap();
        assert_eq!(book.title, "1984");
        assert_eq!(book.publication_year, 1949);
        assert_eq!(book.author_id, 2);
    }

    #[test]
    fn book_form_rejects_future_year() {
        let errs = field_errors(BookForm::validate(json!({"title": "T", "publication_year": 2027, "author": 1}), 2026).unwrap_err());
        assert_eq!(
            errs.get("publication_year").unwrap(),
            ["Publication year cannot be in the future. Current year is 2026."]
        );
    }

    #[test]
    fn book_form_reports_every_missing_field() {
        let errs = field_errors(BookForm::validate(json!({"title": "   "}), 2026).unwrap_err());
        for field in ["title", "publication_year", "author"] {
            assert_eq!(errs.get(field).unwrap(), [REQUIRED], "{field}");
        }
    }

    #[test]
    fn title_length_limit() {
        let long = "x".repeat(TITLE_MAX + 1);
        let errs = field_errors(BookForm::validate(json!({"title": long, "publication_year": 1, "author": 1}), 2026).unwrap_err());
        assert!(errs.get("title").unwrap()[0].starts_with("Ensure this field has at most 200 characters"));
    }

    #[test]
    fn partial_form_only_checks_present_fields() {
        let changes = BookForm::validate_partial(json!({"title": "New"}), 2026).unwrap();
        assert_eq!(changes.title.as_deref(), Some("New"));
        assert!(changes.publication_year.is_none() && changes.author_id.is_none());
        assert!(BookForm::validate_partial(json!({"publication_year": 3000}), 2026).is_err());
    }

    #[test]
    fn non_object_body_is_bad_request() {
        assert!(matches!(BookForm::validate(json!([1, 2]), 2026), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn shelf_form_bounds_year() {
        let errs = field_errors(ShelfBookForm::validate(json!({"title": "T", "author": 1, "publication_year": 999}), 2026).unwrap_err());
        assert!(errs.get("publication_year").unwrap()[0].contains("greater than or equal to 1000"));
        assert!(ShelfBookForm::validate(json!({"title": "T", "author": 1, "publication_year": 2026}), 2026).is_ok());
    }

    #[test]
    fn feedback_rating_range() {
        assert!(FeedbackForm::validate(json!({"user_feedback": "Great", "rating": 5})).is_ok());
        let errs = field_errors(FeedbackForm::validate(json!({"user_feedback": "", "rating": 6})).unwrap_err());
        assert!(errs.contains("user_feedback") && errs.contains("rating"));
    }

    #[test]
    fn register_checks_username_and_passwords() {
        let ok = RegisterForm::validate(json!({
            "username": "jane.doe+1", "email": "jane@example.com",
            "password1": "s3cret-pass", "password2": "s3cret-pass"
        }))
        .unwrap();
        assert_eq!(ok.username, "jane.doe+1");

        let errs = field_errors(
            RegisterForm::validate(json!({
                "username": "jane doe", "email": "nope",
                "password1": "12345678", "password2": "12345678"
            }))
            .unwrap_err(),
        );
        assert!(errs.contains("username"));
        assert!(errs.contains("email"));
        assert_eq!(errs.get("password2").unwrap(), ["This password is entirely numeric."]);

        let errs = field_errors(
            RegisterForm::validate(json!({
                "username": "jane", "email": "jane@example.com",
                "password1": "abcdefgh", "password2": "abcdefgx"
            }))
            .unwrap_err(),
        );
        assert_eq!(errs.get("password2").unwrap(), ["The two password fields didn't match."]);
    }

    #[test]
    fn profile_form_is_partial() {
        let changes = ProfileForm::validate(json!({"first_name": "Jane"})).unwrap();
        assert_eq!(changes.first_name.as_deref(), Some("Jane"));
        assert!(changes.email.is_none());
        assert!(ProfileForm::validate(json!({"email": "bad"})).is_err());
    }

    #[test]
    fn tags_split_trim_and_dedupe() {
        let post = PostForm::validate(json!({
            "title": "Hello", "content": "Body",
            "tags": ["Rust, web ", "rust", " ", "Web Dev"]
        }))
        .unwrap();
        assert_eq!(post.tags, vec!["Rust", "web", "Web Dev"]);
        let post = PostForm::validate(json!({"title": "Hi", "content": "x", "tags": "a,b"})).unwrap();
        assert_eq!(post.tags, vec!["a", "b"]);
    }

    #[test]
    fn overlong_tag_is_a_field_error() {
        let long = "x".repeat(TAG_MAX + 50);
        let errs = field_errors(
            PostForm::validate(json!({"title": "Hi", "content": "x", "tags": ["ok", long]})).unwrap_err(),
        );
        assert_eq!(errs.get("tags").unwrap(), ["Ensure each tag has at most 100 characters."]);

        let edge = "y".repeat(TAG_MAX);
        let post = PostForm::validate(json!({"title": "Hi", "content": "x", "tags": [edge]})).unwrap();
        assert_eq!(post.tags[0].len(), TAG_MAX);
    }

    #[test]
    fn role_and_permission_forms_parse_names() {
        assert_eq!(RoleForm::validate(json!({"role": "Librarian"})).unwrap(), Role::Librarian);
        assert!(RoleForm::validate(json!({"role": "Janitor"})).is_err());
        assert_eq!(
            PermissionForm::validate(json!({"codename": "bookshelf.can_view"})).unwrap(),
            Permission::ShelfView
        );
    }

    #[test]
    fn comment_must_not_be_blank() {
        assert!(CommentForm::validate(json!({"content": "  "})).is_err());
        assert_eq!(CommentForm::validate(json!({"content": "Nice"})).unwrap(), "Nice");
    }
}
