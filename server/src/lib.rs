//! Podvault document server.
//!
//! Stores the remote copy of a podvault snapshot: one JSON document per
//! `(project, collection, id)` with merge-write semantics. The engine's
//! `HttpRemote` is the client side of this API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;

pub use crate::config::{Config, ConfigError};
pub use crate::db::{DocumentKey, DocumentStore, StoredDocument};
pub use crate::error::AppError;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: DocumentStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: DocumentStore, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

/// Build the router with tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
