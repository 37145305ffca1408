//! HTTP handlers, one module per app.

pub mod accounts;
pub mod api;
pub mod blog;
pub mod bookshelf;
pub mod relationship;
