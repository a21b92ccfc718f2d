//! Biography translation and enrichment
//!
//! Wraps the external text-generation service behind the [`Enricher`] trait.
//! The gateway never raises past its boundary: any transport, timeout, or
//! parse failure degrades to the identity fallback, where both derived
//! fields equal the submitted text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Upstream request timeout; expiry is treated as unavailability
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Derived biography text; both fields are always present
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBio {
    pub translated: String,
    pub enriched: String,
}

impl EnrichedBio {
    fn identity(text: &str) -> Self {
        Self {
            translated: text.to_string(),
            enriched: text.to_string(),
        }
    }
}

/// Text translation and enrichment capability, selected at startup
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Translate `text` from `from_lang` to `to_lang` and produce an
    /// enriched listing bio. Infallible: empty input yields empty output,
    /// and any upstream problem yields the input unchanged.
    async fn enrich(&self, text: &str, from_lang: &str, to_lang: &str) -> EnrichedBio;
}

/// Pass-through used when no enrichment credential is configured
pub struct IdentityEnricher;

#[async_trait]
impl Enricher for IdentityEnricher {
    async fn enrich(&self, text: &str, _from_lang: &str, _to_lang: &str) -> EnrichedBio {
        EnrichedBio::identity(text)
    }
}

/// Client for the Gemini `generateContent` API
pub struct GeminiEnricher {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiEnricher {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL.to_string())
    }

    pub fn with_model(api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model,
        }
    }

    /// Issue one generation request and return the raw response text
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_ENDPOINT, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("enrichment service returned {}", response.status());
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse enrichment response")?;

        payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| anyhow::anyhow!("enrichment response contained no text"))
    }
}

#[async_trait]
impl Enricher for GeminiEnricher {
    async fn enrich(&self, text: &str, from_lang: &str, to_lang: &str) -> EnrichedBio {
        if text.is_empty() {
            return EnrichedBio::identity(text);
        }

        let prompt = build_prompt(text, from_lang, to_lang);

        match self.generate(&prompt).await {
            Ok(raw) => {
                debug!("Enrichment response received ({} bytes)", raw.len());
                parse_bio_response(&raw, text)
            }
            Err(e) => {
                warn!("Enrichment unavailable, keeping original bio: {:#}", e);
                EnrichedBio::identity(text)
            }
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Expected shape of the model's answer; missing keys fall back per field
#[derive(Deserialize)]
struct BioFields {
    translated: Option<String>,
    enriched: Option<String>,
}

fn build_prompt(text: &str, from_lang: &str, to_lang: &str) -> String {
    format!(
        "Translate the following artisan story from {} to {}. Then write a short \
         enriched artisan bio (2-3 sentences) suitable for a marketplace listing \
         that preserves origin, craftsmanship and simple care notes.\n\
         Return ONLY valid JSON with keys: translated, enriched.\n\nInput:\n{}",
        from_lang, to_lang, text
    )
}

/// Parse the model's answer, tolerating prose around the JSON object.
/// Falls back to `fallback` for anything that cannot be recovered.
fn parse_bio_response(raw: &str, fallback: &str) -> EnrichedBio {
    let parsed = extract_json_block(raw)
        .and_then(|block| serde_json::from_str::<BioFields>(block).ok())
        .or_else(|| serde_json::from_str::<BioFields>(raw.trim()).ok());

    match parsed {
        Some(fields) => EnrichedBio {
            translated: fields.translated.unwrap_or_else(|| fallback.to_string()),
            enriched: fields.enriched.unwrap_or_else(|| fallback.to_string()),
        },
        None => {
            warn!("Enrichment response was not valid JSON, keeping original bio");
            EnrichedBio::identity(fallback)
        }
    }
}

/// Slice from the first `{` to the last `}`, the widest candidate object
fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
