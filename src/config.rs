//! Configuration management for the Artisan Catalog Service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis connection URL; when absent the service runs on the in-memory
    /// catalog store
    pub redis_url: Option<String>,

    /// Directory where product images are stored
    pub media_dir: PathBuf,

    /// Public origin prepended to image URLs; when absent, URLs are
    /// root-relative
    pub public_origin: Option<String>,

    /// Credential for the text-enrichment service; when absent, biographies
    /// pass through unchanged
    pub gemini_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Config {
            host: env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("CATALOG_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid CATALOG_PORT")?,

            redis_url: non_empty(env::var("REDIS_URL").ok()),

            media_dir: env::var("MEDIA_DIR")
                .unwrap_or_else(|_| "media".to_string())
                .into(),

            public_origin: normalize_origin(env::var("BACKEND_ORIGIN").ok()),

            gemini_api_key: non_empty(env::var("GEMINI_API_KEY").ok()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("CATALOG_PORT must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Treat empty environment values as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Strip trailing slashes so URL building can safely append paths
fn normalize_origin(value: Option<String>) -> Option<String> {
    non_empty(value).map(|v| v.trim_end_matches('/').to_string())
}
