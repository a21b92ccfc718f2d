//! Artisan Catalog Service
//!
//! Marketplace prototype backend connecting artisans and customers: artisans
//! register profiles with translated/enriched biographies and upload product
//! listings with photos; customers search products by name and location.
//!
//! ## Architecture
//!
//! - `storage` — catalog repository over Redis (in-memory variant for tests
//!   and credential-less runs)
//! - `assets` — durable image storage with a best-effort normalization pass
//! - `enrich` — gateway to the external text-generation service, degrading
//!   to a pass-through when unavailable
//! - `handlers` — the HTTP surface orchestrating the above
//!
//! ## Endpoints
//!
//! - `POST /register_artisan` - Create an artisan profile
//! - `GET /artisan/{id}` - Fetch a profile with its products
//! - `PUT /artisan/{id}` - Partially update a profile
//! - `POST /upload_product` - Create a product listing with its image
//! - `PUT /product/{id}` - Partially update a product, optionally replacing
//!   the image
//! - `DELETE /product/{id}` - Remove a product listing
//! - `GET /find_artisan` - Search artisans by name/location
//! - `GET /search` - Search products by name, narrowed by artisan location
//! - `GET /image/{product_id}` - Legacy binary image fetch
//! - `GET /static/{filename}` - Direct image serving
//! - `GET /health` - Health check

pub mod assets;
pub mod config;
pub mod enrich;
pub mod error;
pub mod handlers;
pub mod models;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use assets::AssetStore;
pub use config::Config;
pub use enrich::{Enricher, GeminiEnricher, IdentityEnricher};
pub use storage::{CatalogStore, MemoryCatalog, RedisCatalog};

/// Largest accepted upload body (image plus form fields)
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub assets: AssetStore,
    pub enricher: Arc<dyn Enricher>,
    pub enrichment_enabled: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(
        store: Arc<dyn CatalogStore>,
        assets: AssetStore,
        enricher: Arc<dyn Enricher>,
        enrichment_enabled: bool,
    ) -> Self {
        Self {
            store,
            assets,
            enricher,
            enrichment_enabled,
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let media_dir = state.assets.media_dir().to_path_buf();
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        // Artisan profiles
        .route("/register_artisan", post(handlers::register_artisan_handler))
        .route("/artisan/{artisan_id}", get(handlers::get_artisan_handler))
        .route("/artisan/{artisan_id}", put(handlers::update_artisan_handler))
        // Product listings
        .route("/upload_product", post(handlers::upload_product_handler))
        .route("/product/{product_id}", put(handlers::update_product_handler))
        .route(
            "/product/{product_id}",
            delete(handlers::delete_product_handler),
        )
        // Search
        .route("/find_artisan", get(handlers::find_artisan_handler))
        .route("/search", get(handlers::search_handler))
        // Image assets
        .route("/image/{product_id}", get(handlers::get_image_handler))
        .nest_service("/static", ServeDir::new(media_dir))
        .with_state(state)
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
