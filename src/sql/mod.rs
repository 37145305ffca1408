//! Safe SQL builder and parameter binding for the PostgreSQL store.

mod builder;
mod params;

pub use builder::*;
pub use params::BindValue;
