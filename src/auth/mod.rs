//! Authentication (password hashing, sessions) and authorization guards.

pub mod guard;
pub mod password;
pub mod session;

pub use guard::*;
pub use session::{AuthUser, SESSION_COOKIE};
