//! Bookshelf server: reads settings, opens the store, serves every app.
//!
//! Run from repo root: `cargo run -p bookshelf-server`

use bookshelf::{app_router, init_tracing, open_store, AccountService, AppState, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing();

    let store = open_store(&settings).await?;
    if let Some(admin) = AccountService::bootstrap_admin(store.as_ref(), &settings).await? {
        tracing::info!(username = %admin.username, "created bootstrap admin");
    }

    let bind_addr = settings.bind_addr;
    let app = app_router(AppState::new(store, settings));
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("bookshelf listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
