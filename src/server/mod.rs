//! HTTP API over a lessonnote workspace.
//!
//! The router shares one store and one search cache between requests. Every
//! mutating handler persists the store before responding.

pub mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::SqliteCache;
use crate::error::Result;
use crate::storage::LoroStore;

pub use error::ApiError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<LoroStore>>,
    pub cache: Arc<Mutex<SqliteCache>>,
    pub search_limit: usize,
}

impl AppState {
    pub fn new(store: LoroStore, cache: SqliteCache, search_limit: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            cache: Arc::new(Mutex::new(cache)),
            search_limit,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/lessons/import", post(handlers::import_lesson))
        .route(
            "/lessons/{id}",
            get(handlers::get_lesson).put(handlers::save_lesson),
        )
        .route("/lessons/{id}/template", get(handlers::lesson_template))
        .route(
            "/users/{user}/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/users/{user}/notes/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/users/{user}/search", get(handlers::search))
        .route(
            "/users/{user}/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route("/users/{user}/tags/{id}", delete(handlers::delete_tag))
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` is cancelled
pub async fn serve(state: AppState, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "lessonnote server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}
