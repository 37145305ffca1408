//! Entity records shared by the store, services, and handlers.

pub mod accounts;
pub mod blog;
pub mod catalog;

pub use accounts::*;
pub use blog::*;
pub use catalog::*;
