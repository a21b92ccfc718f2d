//! Catalog storage for artisans and products
//!
//! The [`CatalogStore`] trait is the data-access contract; [`RedisCatalog`]
//! is the durable backend and [`MemoryCatalog`] carries identical semantics
//! for tests and credential-less development runs.

use crate::models::{Artisan, ArtisanPatch, NewArtisan, NewProduct, Product, ProductPatch};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Default result cap for artisan searches
pub const FIND_ARTISANS_LIMIT: usize = 50;

/// Default result cap for product searches
pub const SEARCH_PRODUCTS_LIMIT: usize = 20;

const ARTISANS_INDEX: &str = "artisans:all";
const PRODUCTS_INDEX: &str = "products:all";
const ARTISAN_ID_COUNTER: &str = "artisan:next_id";
const PRODUCT_ID_COUNTER: &str = "product:next_id";

fn artisan_key(id: i64) -> String {
    format!("artisan:{}", id)
}

fn product_key(id: i64) -> String {
    format!("product:{}", id)
}

fn artisan_products_key(artisan_id: i64) -> String {
    format!("artisan:{}:products", artisan_id)
}

/// Case-insensitive substring match used by every search predicate
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// ANDed artisan predicates; absent predicates are no-ops
fn artisan_matches(artisan: &Artisan, name: Option<&str>, location: Option<&str>) -> bool {
    name.map_or(true, |n| contains_ci(&artisan.name, n))
        && location.map_or(true, |l| contains_ci(&artisan.location, l))
}

/// Data-access contract over artisans and products
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_artisan(&self, fields: NewArtisan) -> Result<Artisan>;

    async fn get_artisan(&self, id: i64) -> Result<Option<Artisan>>;

    /// Partial update; `None` when the artisan does not exist
    async fn update_artisan(&self, id: i64, patch: ArtisanPatch) -> Result<Option<Artisan>>;

    /// Case-insensitive substring match on each supplied predicate, ANDed,
    /// capped at `limit`, in ascending-id order
    async fn find_artisans(
        &self,
        name: Option<&str>,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Artisan>>;

    /// `None` when `artisan_id` does not resolve to an existing artisan
    async fn create_product(&self, fields: NewProduct) -> Result<Option<Product>>;

    async fn get_product(&self, id: i64) -> Result<Option<Product>>;

    /// Partial update; `None` when the product does not exist
    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>>;

    /// `false` when the product does not exist
    async fn delete_product(&self, id: i64) -> Result<bool>;

    async fn products_for_artisan(&self, artisan_id: i64) -> Result<Vec<Product>>;

    /// Joins each matching product to its owning artisan; product names are
    /// matched by case-insensitive substring, with an optional artisan
    /// location filter
    async fn search_products(
        &self,
        name_query: &str,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Product, Artisan)>>;
}

/// Redis-backed catalog storage
pub struct RedisCatalog {
    conn: ConnectionManager,
}

impl RedisCatalog {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    async fn load_artisan(conn: &mut ConnectionManager, id: i64) -> Result<Option<Artisan>> {
        let json: Option<String> = conn.get(artisan_key(id)).await?;

        match json {
            Some(data) => {
                let artisan: Artisan =
                    serde_json::from_str(&data).context("Failed to deserialize artisan")?;
                Ok(Some(artisan))
            }
            None => Ok(None),
        }
    }

    async fn load_product(conn: &mut ConnectionManager, id: i64) -> Result<Option<Product>> {
        let json: Option<String> = conn.get(product_key(id)).await?;

        match json {
            Some(data) => {
                let product: Product =
                    serde_json::from_str(&data).context("Failed to deserialize product")?;
                Ok(Some(product))
            }
            None => Ok(None),
        }
    }

    async fn save_artisan(conn: &mut ConnectionManager, artisan: &Artisan) -> Result<()> {
        let json = serde_json::to_string(artisan).context("Failed to serialize artisan")?;
        let _: () = conn.set(artisan_key(artisan.id), json).await?;
        Ok(())
    }

    async fn save_product(conn: &mut ConnectionManager, product: &Product) -> Result<()> {
        let json = serde_json::to_string(product).context("Failed to serialize product")?;
        let _: () = conn.set(product_key(product.id), json).await?;
        Ok(())
    }

    async fn index_members(conn: &mut ConnectionManager, index: &str) -> Result<Vec<i64>> {
        let mut ids: Vec<i64> = conn.smembers(index).await?;
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl CatalogStore for RedisCatalog {
    async fn create_artisan(&self, fields: NewArtisan) -> Result<Artisan> {
        let mut conn = self.conn.clone();

        let id: i64 = conn.incr(ARTISAN_ID_COUNTER, 1).await?;
        let artisan = Artisan::new(id, fields);

        Self::save_artisan(&mut conn, &artisan).await?;
        let _: () = conn.sadd(ARTISANS_INDEX, id).await?;

        info!("Created artisan: {}", id);
        Ok(artisan)
    }

    async fn get_artisan(&self, id: i64) -> Result<Option<Artisan>> {
        let mut conn = self.conn.clone();
        Self::load_artisan(&mut conn, id).await
    }

    async fn update_artisan(&self, id: i64, patch: ArtisanPatch) -> Result<Option<Artisan>> {
        let mut conn = self.conn.clone();

        let Some(mut artisan) = Self::load_artisan(&mut conn, id).await? else {
            debug!("Artisan not found for update: {}", id);
            return Ok(None);
        };

        artisan.apply(patch);
        Self::save_artisan(&mut conn, &artisan).await?;

        info!("Updated artisan: {}", id);
        Ok(Some(artisan))
    }

    async fn find_artisans(
        &self,
        name: Option<&str>,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Artisan>> {
        let mut conn = self.conn.clone();

        let ids = Self::index_members(&mut conn, ARTISANS_INDEX).await?;

        let mut artisans = Vec::new();
        for id in ids {
            if artisans.len() >= limit {
                break;
            }
            if let Some(artisan) = Self::load_artisan(&mut conn, id).await? {
                if artisan_matches(&artisan, name, location) {
                    artisans.push(artisan);
                }
            }
        }

        Ok(artisans)
    }

    async fn create_product(&self, fields: NewProduct) -> Result<Option<Product>> {
        let mut conn = self.conn.clone();

        // The owning artisan must resolve at creation time.
        if Self::load_artisan(&mut conn, fields.artisan_id).await?.is_none() {
            debug!("Artisan not found for product creation: {}", fields.artisan_id);
            return Ok(None);
        }

        let id: i64 = conn.incr(PRODUCT_ID_COUNTER, 1).await?;
        let product = Product::new(id, fields);

        Self::save_product(&mut conn, &product).await?;
        let _: () = conn.sadd(PRODUCTS_INDEX, id).await?;
        let _: () = conn
            .sadd(artisan_products_key(product.artisan_id), id)
            .await?;

        info!(
            "Created product: {} for artisan: {}",
            id, product.artisan_id
        );
        Ok(Some(product))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let mut conn = self.conn.clone();
        Self::load_product(&mut conn, id).await
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>> {
        let mut conn = self.conn.clone();

        let Some(mut product) = Self::load_product(&mut conn, id).await? else {
            debug!("Product not found for update: {}", id);
            return Ok(None);
        };

        product.apply(patch);
        Self::save_product(&mut conn, &product).await?;

        info!("Updated product: {}", id);
        Ok(Some(product))
    }

    async fn delete_product(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn.clone();

        let Some(product) = Self::load_product(&mut conn, id).await? else {
            return Ok(false);
        };

        let _: () = conn.del(product_key(id)).await?;
        let _: () = conn.srem(PRODUCTS_INDEX, id).await?;
        let _: () = conn
            .srem(artisan_products_key(product.artisan_id), id)
            .await?;

        info!("Deleted product: {}", id);
        Ok(true)
    }

    async fn products_for_artisan(&self, artisan_id: i64) -> Result<Vec<Product>> {
        let mut conn = self.conn.clone();

        let ids = Self::index_members(&mut conn, &artisan_products_key(artisan_id)).await?;

        let mut products = Vec::new();
        for id in ids {
            if let Some(product) = Self::load_product(&mut conn, id).await? {
                products.push(product);
            }
        }

        Ok(products)
    }

    async fn search_products(
        &self,
        name_query: &str,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Product, Artisan)>> {
        let mut conn = self.conn.clone();

        let ids = Self::index_members(&mut conn, PRODUCTS_INDEX).await?;

        let mut results = Vec::new();
        for id in ids {
            if results.len() >= limit {
                break;
            }
            let Some(product) = Self::load_product(&mut conn, id).await? else {
                continue;
            };
            if !contains_ci(&product.name, name_query) {
                continue;
            }
            let Some(artisan) = Self::load_artisan(&mut conn, product.artisan_id).await? else {
                continue;
            };
            if !location.map_or(true, |l| contains_ci(&artisan.location, l)) {
                continue;
            }
            results.push((product, artisan));
        }

        Ok(results)
    }
}

#[derive(Default)]
struct MemoryInner {
    artisans: BTreeMap<i64, Artisan>,
    products: BTreeMap<i64, Product>,
    next_artisan_id: i64,
    next_product_id: i64,
}

/// In-memory catalog storage with the same semantics as [`RedisCatalog`].
///
/// Selected at startup when no Redis URL is configured; data does not
/// survive restarts.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: Mutex<MemoryInner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("catalog lock poisoned"))
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn create_artisan(&self, fields: NewArtisan) -> Result<Artisan> {
        let mut inner = self.lock()?;
        inner.next_artisan_id += 1;
        let artisan = Artisan::new(inner.next_artisan_id, fields);
        inner.artisans.insert(artisan.id, artisan.clone());
        Ok(artisan)
    }

    async fn get_artisan(&self, id: i64) -> Result<Option<Artisan>> {
        Ok(self.lock()?.artisans.get(&id).cloned())
    }

    async fn update_artisan(&self, id: i64, patch: ArtisanPatch) -> Result<Option<Artisan>> {
        let mut inner = self.lock()?;
        let Some(artisan) = inner.artisans.get_mut(&id) else {
            return Ok(None);
        };
        artisan.apply(patch);
        Ok(Some(artisan.clone()))
    }

    async fn find_artisans(
        &self,
        name: Option<&str>,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Artisan>> {
        let inner = self.lock()?;
        Ok(inner
            .artisans
            .values()
            .filter(|a| artisan_matches(a, name, location))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_product(&self, fields: NewProduct) -> Result<Option<Product>> {
        let mut inner = self.lock()?;
        if !inner.artisans.contains_key(&fields.artisan_id) {
            return Ok(None);
        }
        inner.next_product_id += 1;
        let product = Product::new(inner.next_product_id, fields);
        inner.products.insert(product.id, product.clone());
        Ok(Some(product))
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        Ok(self.lock()?.products.get(&id).cloned())
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>> {
        let mut inner = self.lock()?;
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(None);
        };
        product.apply(patch);
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.products.remove(&id).is_some())
    }

    async fn products_for_artisan(&self, artisan_id: i64) -> Result<Vec<Product>> {
        let inner = self.lock()?;
        Ok(inner
            .products
            .values()
            .filter(|p| p.artisan_id == artisan_id)
            .cloned()
            .collect())
    }

    async fn search_products(
        &self,
        name_query: &str,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Product, Artisan)>> {
        let inner = self.lock()?;
        let mut results = Vec::new();
        for product in inner.products.values() {
            if results.len() >= limit {
                break;
            }
            if !contains_ci(&product.name, name_query) {
                continue;
            }
            let Some(artisan) = inner.artisans.get(&product.artisan_id) else {
                continue;
            };
            if !location.map_or(true, |l| contains_ci(&artisan.location, l)) {
                continue;
            }
            results.push((product.clone(), artisan.clone()));
        }
        Ok(results)
    }
}
