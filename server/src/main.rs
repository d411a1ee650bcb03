//! Podvault Server - remote document store for the podvault mirror.

use podvault_server::{app, db, AppState, Config, DocumentStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podvault_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Podvault Server on {}:{}", config.host, config.port);

    let store = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = db::create_pool(database_url, config.max_connections).await?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;
            DocumentStore::Postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory only");
            DocumentStore::memory()
        }
    };

    if config.api_key.is_none() {
        tracing::warn!("API_KEY not set, accepting unauthenticated requests");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let app = app(AppState::new(store, config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
