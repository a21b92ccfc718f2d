//! Artisan Catalog Service
//!
//! REST API for artisan profiles, product listings, and image assets

use anyhow::{Context, Result};
use artisan_catalog::{
    create_router, AppState, AssetStore, CatalogStore, Config, Enricher, GeminiEnricher,
    IdentityEnricher, MemoryCatalog, RedisCatalog,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artisan_catalog=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Artisan Catalog Service");
    info!("Media directory: {}", config.media_dir.display());
    info!("Listening on {}", config.address());

    // Catalog storage
    let store: Arc<dyn CatalogStore> = match &config.redis_url {
        Some(url) => Arc::new(
            RedisCatalog::new(url)
                .await
                .context("Failed to initialize catalog storage")?,
        ),
        None => {
            warn!("REDIS_URL not set, using the in-memory catalog store; data will not survive restarts");
            Arc::new(MemoryCatalog::new())
        }
    };

    // Image assets
    let assets = AssetStore::new(config.media_dir.clone(), config.public_origin.clone())
        .context("Failed to initialize asset store")?;

    // Biography enrichment, selected by credential presence
    let enrichment_enabled = config.gemini_api_key.is_some();
    let enricher: Arc<dyn Enricher> = match config.gemini_api_key.clone() {
        Some(api_key) => {
            info!("Enrichment credential loaded");
            Arc::new(GeminiEnricher::new(api_key))
        }
        None => {
            warn!("GEMINI_API_KEY not set, biographies will be stored without translation or enrichment");
            Arc::new(IdentityEnricher)
        }
    };

    // Create application state
    let state = AppState::new(store, assets, enricher, enrichment_enabled);

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Artisan Catalog Service running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
