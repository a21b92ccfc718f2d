//! API request handlers for the Artisan Catalog Service

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    assets::AssetStore,
    error::CatalogError,
    models::{ArtisanPatch, BioText, NewArtisan, NewProduct, Product, ProductPatch},
    storage::{FIND_ARTISANS_LIMIT, SEARCH_PRODUCTS_LIMIT},
    AppState,
};

/// Marketplace display language; biographies are translated into it
const TARGET_LANGUAGE: &str = "English";

fn default_language() -> String {
    TARGET_LANGUAGE.to_string()
}

#[derive(Debug, Deserialize)]
pub struct RegisterArtisanRequest {
    pub name: String,
    pub location: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub contact_number: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterArtisanResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateArtisanRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub bio: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct ArtisanProfileResponse {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub language: String,
    pub contact_number: String,
    pub bio_original: String,
    pub bio_translated: String,
    pub bio_enriched: String,
    pub products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize)]
pub struct UploadProductResponse {
    pub id: i64,
    /// Fully resolved public image URL
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct FindArtisanQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct ArtisanSummary {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub language: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub location: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultArtisan {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub contact_number: String,
    pub bio: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResult {
    pub product_id: i64,
    pub name: String,
    pub price: String,
    pub image_url: String,
    pub artisan: SearchResultArtisan,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "artisan-catalog",
        "enrichment_enabled": state.enrichment_enabled,
    }))
}

/// Register a new artisan profile
pub async fn register_artisan_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterArtisanRequest>,
) -> Result<Json<RegisterArtisanResponse>, CatalogError> {
    require_field(&payload.name, "name")?;
    require_field(&payload.location, "location")?;
    validate_contact_number(&payload.contact_number)?;

    let bio = state
        .enricher
        .enrich(&payload.bio, &payload.language, TARGET_LANGUAGE)
        .await;

    let artisan = state
        .store
        .create_artisan(NewArtisan {
            name: payload.name,
            location: payload.location,
            language: payload.language,
            contact_number: payload.contact_number,
            bio: BioText {
                original: payload.bio,
                translated: bio.translated,
                enriched: bio.enriched,
            },
        })
        .await?;

    info!("Registered artisan: {} ({})", artisan.id, artisan.name);

    Ok(Json(RegisterArtisanResponse {
        id: artisan.id,
        name: artisan.name,
    }))
}

/// Fetch an artisan profile with its products
pub async fn get_artisan_handler(
    State(state): State<Arc<AppState>>,
    Path(artisan_id): Path<i64>,
) -> Result<Json<ArtisanProfileResponse>, CatalogError> {
    let artisan = state
        .store
        .get_artisan(artisan_id)
        .await?
        .ok_or_else(artisan_not_found)?;

    let products = state
        .store
        .products_for_artisan(artisan_id)
        .await?
        .into_iter()
        .map(|p| product_summary(&state.assets, p))
        .collect();

    Ok(Json(ArtisanProfileResponse {
        id: artisan.id,
        name: artisan.name,
        location: artisan.location,
        language: artisan.language,
        contact_number: artisan.contact_number,
        bio_original: artisan.bio_original,
        bio_translated: artisan.bio_translated,
        bio_enriched: artisan.bio_enriched,
        products,
    }))
}

/// Partially update an artisan profile
pub async fn update_artisan_handler(
    State(state): State<Arc<AppState>>,
    Path(artisan_id): Path<i64>,
    Json(payload): Json<UpdateArtisanRequest>,
) -> Result<Json<StatusResponse>, CatalogError> {
    if let Some(contact_number) = &payload.contact_number {
        validate_contact_number(contact_number)?;
    }

    let current = state
        .store
        .get_artisan(artisan_id)
        .await?
        .ok_or_else(artisan_not_found)?;

    // A new bio is re-enriched against the language in effect after this
    // update, so a request carrying both fields uses the submitted language.
    let bio = match &payload.bio {
        Some(text) => {
            let language = payload.language.clone().unwrap_or(current.language);
            let derived = state.enricher.enrich(text, &language, TARGET_LANGUAGE).await;
            Some(BioText {
                original: text.clone(),
                translated: derived.translated,
                enriched: derived.enriched,
            })
        }
        None => None,
    };

    state
        .store
        .update_artisan(
            artisan_id,
            ArtisanPatch {
                name: payload.name,
                location: payload.location,
                language: payload.language,
                contact_number: payload.contact_number,
                bio,
            },
        )
        .await?
        .ok_or_else(artisan_not_found)?;

    Ok(Json(StatusResponse {
        status: "ok",
        id: artisan_id,
    }))
}

/// Create a product listing with its image
pub async fn upload_product_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<UploadProductResponse>, CatalogError> {
    let form = collect_product_form(multipart).await?;

    let artisan_id = form
        .artisan_id
        .ok_or_else(|| CatalogError::Validation("artisan_id is required".to_string()))?
        .trim()
        .parse::<i64>()
        .map_err(|_| CatalogError::Validation("artisan_id must be an integer".to_string()))?;

    let name = form
        .product_name
        .ok_or_else(|| CatalogError::Validation("product_name is required".to_string()))?;
    require_field(&name, "product_name")?;

    let (filename, bytes) = form
        .file
        .ok_or_else(|| CatalogError::Validation("file is required".to_string()))?;
    if bytes.is_empty() {
        return Err(CatalogError::Validation("file must not be empty".to_string()));
    }

    if state.store.get_artisan(artisan_id).await?.is_none() {
        return Err(artisan_not_found());
    }

    // The asset is written before the catalog record so a failed write can
    // never leave a product pointing at a missing file.
    let stored_name = state
        .assets
        .store(bytes, filename.as_deref())
        .await
        .map_err(storage_fault)?;

    let product = state
        .store
        .create_product(NewProduct {
            artisan_id,
            name,
            description: form.description.unwrap_or_default(),
            price: form.price.unwrap_or_default(),
            image_path: stored_name.clone(),
        })
        .await?
        .ok_or_else(artisan_not_found)?;

    info!(
        "Uploaded product: {} for artisan: {}",
        product.id, artisan_id
    );

    Ok(Json(UploadProductResponse {
        id: product.id,
        image: state.assets.public_url(&stored_name),
    }))
}

/// Partially update a product, optionally replacing its image
pub async fn update_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<StatusResponse>, CatalogError> {
    let form = collect_product_form(multipart).await?;

    if state.store.get_product(product_id).await?.is_none() {
        return Err(product_not_found());
    }

    // A replacement image gets a fresh stored name; the previous asset is
    // deliberately left on disk (stale files are not reclaimed).
    let image_path = match form.file {
        Some((filename, bytes)) if !bytes.is_empty() => Some(
            state
                .assets
                .store(bytes, filename.as_deref())
                .await
                .map_err(storage_fault)?,
        ),
        _ => None,
    };

    state
        .store
        .update_product(
            product_id,
            ProductPatch {
                name: form.product_name,
                description: form.description,
                price: form.price,
                image_path,
            },
        )
        .await?
        .ok_or_else(product_not_found)?;

    Ok(Json(StatusResponse {
        status: "ok",
        id: product_id,
    }))
}

/// Delete a product listing
pub async fn delete_product_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<Json<StatusResponse>, CatalogError> {
    let deleted = state.store.delete_product(product_id).await?;
    if !deleted {
        return Err(product_not_found());
    }

    info!("Deleted product: {}", product_id);

    Ok(Json(StatusResponse {
        status: "deleted",
        id: product_id,
    }))
}

/// Search artisans by name and/or location
pub async fn find_artisan_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FindArtisanQuery>,
) -> Result<Json<Vec<ArtisanSummary>>, CatalogError> {
    let artisans = state
        .store
        .find_artisans(
            non_empty_param(&query.name),
            non_empty_param(&query.location),
            FIND_ARTISANS_LIMIT,
        )
        .await?;

    Ok(Json(
        artisans
            .into_iter()
            .map(|a| ArtisanSummary {
                id: a.id,
                name: a.name,
                location: a.location,
                language: a.language,
            })
            .collect(),
    ))
}

/// Search products by name, optionally narrowed by artisan location
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, CatalogError> {
    let limit = query.limit.unwrap_or(SEARCH_PRODUCTS_LIMIT);

    let results = state
        .store
        .search_products(query.q.trim(), non_empty_param(&query.location), limit)
        .await?;

    Ok(Json(
        results
            .into_iter()
            .map(|(product, artisan)| SearchResult {
                product_id: product.id,
                name: product.name,
                price: product.price,
                image_url: state.assets.public_url(&product.image_path),
                artisan: SearchResultArtisan {
                    id: artisan.id,
                    name: artisan.name,
                    location: artisan.location,
                    contact_number: artisan.contact_number,
                    bio: artisan.bio_translated,
                },
            })
            .collect(),
    ))
}

/// Legacy binary fetch of a product's image by product id
pub async fn get_image_handler(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<Response, CatalogError> {
    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or_else(product_not_found)?;

    let bytes = state
        .assets
        .retrieve(&product.image_path)
        .await?
        .ok_or_else(|| CatalogError::NotFound("Image file not found".to_string()))?;

    let content_type = content_type_for(&product.image_path);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Multipart fields shared by product creation and update
#[derive(Default)]
struct ProductForm {
    artisan_id: Option<String>,
    product_name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    /// Original filename hint and raw bytes
    file: Option<(Option<String>, Vec<u8>)>,
}

async fn collect_product_form(mut multipart: Multipart) -> Result<ProductForm, CatalogError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                form.file = Some((filename, bytes.to_vec()));
            }
            "artisan_id" => form.artisan_id = Some(field.text().await.map_err(bad_multipart)?),
            "product_name" => form.product_name = Some(field.text().await.map_err(bad_multipart)?),
            "description" => form.description = Some(field.text().await.map_err(bad_multipart)?),
            "price" => form.price = Some(field.text().await.map_err(bad_multipart)?),
            other => warn!("Ignoring unknown form field: {}", other),
        }
    }

    Ok(form)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> CatalogError {
    CatalogError::Validation(format!("Invalid multipart request: {}", err))
}

fn storage_fault(err: anyhow::Error) -> CatalogError {
    CatalogError::Storage(format!("{:#}", err))
}

fn artisan_not_found() -> CatalogError {
    CatalogError::NotFound("Artisan not found".to_string())
}

fn product_not_found() -> CatalogError {
    CatalogError::NotFound("Product not found".to_string())
}

fn product_summary(assets: &AssetStore, product: Product) -> ProductSummary {
    let image_url = assets.public_url(&product.image_path);
    ProductSummary {
        id: product.id,
        name: product.name,
        description: product.description,
        price: product.price,
        image_url,
    }
}

fn require_field(value: &str, field: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

/// Contact numbers supplied through the public flow must be exactly ten
/// digits; empty means "not supplied"
fn validate_contact_number(value: &str) -> Result<(), CatalogError> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() != 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CatalogError::Validation(
            "contact_number must be exactly 10 digits".to_string(),
        ));
    }
    Ok(())
}

fn non_empty_param(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Guess a response content type from the stored file extension
fn content_type_for(name: &str) -> &'static str {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
