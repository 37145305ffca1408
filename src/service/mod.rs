//! Services: validated input in, store calls and logging, domain records out.

mod accounts;
mod blog;
mod catalog;
pub mod validation;

pub use accounts::{AccountService, AccountView, SignedIn, BAD_CREDENTIALS, DUPLICATE_USERNAME};
pub use blog::{BlogService, TaggedPosts};
pub use catalog::{current_year, CatalogService};
pub use validation::*;
