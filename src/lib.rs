//! Bookshelf: book catalog API, library relationships, permission-gated shelf and blog
//! served as one JSON backend over PostgreSQL or an in-memory store.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::Settings;
pub use error::{AppError, ConfigError, FieldErrors};
pub use response::{success_many, success_one};
pub use routes::app_router;
pub use service::AccountService;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_tables, open_store, MemoryStore, PgStore, Store};

/// Install the fmt subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bookshelf=info,tower_http=info")),
        )
        .init();
}
