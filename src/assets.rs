//! Durable storage and normalization of uploaded images
//!
//! Raw bytes are written to the media directory first; a best-effort
//! normalization pass then rewrites the file in place. Callers never reason
//! about storage locations — they hold only the generated filename.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Longest edge after normalization, in pixels
const MAX_DIMENSION: u32 = 1200;

/// Re-encode quality for JPEG output
const JPEG_QUALITY: u8 = 90;

/// Mild unsharp mask, close to Pillow's marketplace-photo defaults
const UNSHARP_SIGMA: f32 = 1.0;
const UNSHARP_THRESHOLD: i32 = 3;

const DEFAULT_EXTENSION: &str = "jpg";

/// File storage for product images
#[derive(Clone)]
pub struct AssetStore {
    media_dir: PathBuf,
    public_origin: Option<String>,
}

impl AssetStore {
    /// Create an asset store rooted at `media_dir`, creating it if needed
    pub fn new(media_dir: impl Into<PathBuf>, public_origin: Option<String>) -> Result<Self> {
        let media_dir = media_dir.into();
        std::fs::create_dir_all(&media_dir).with_context(|| {
            format!("Failed to create media directory: {}", media_dir.display())
        })?;

        Ok(Self {
            media_dir,
            public_origin,
        })
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    /// Persist raw bytes under a generated unique name and attempt the
    /// normalization pass.
    ///
    /// Returns the stored filename. The raw bytes are durable before
    /// normalization begins; a failed normalization (corrupt or unsupported
    /// format) leaves them untouched and is never fatal to the upload.
    pub async fn store(&self, bytes: Vec<u8>, original_name: Option<&str>) -> Result<String> {
        let ext = original_name
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let name = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let path = self.media_dir.join(&name);

        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write asset: {}", path.display()))?;

        let normalize_path = path.clone();
        match tokio::task::spawn_blocking(move || normalize_image(&normalize_path)).await {
            Ok(Ok(())) => debug!("Normalized image: {}", name),
            Ok(Err(e)) => warn!("Image normalization skipped for {}: {:#}", name, e),
            Err(e) => warn!("Image normalization task failed for {}: {}", name, e),
        }

        Ok(name)
    }

    /// Read a stored asset back; `None` when the name does not resolve to an
    /// existing file
    pub async fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(name) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read asset: {}", path.display()))
            }
        }
    }

    /// Build the externally addressable URL for a stored asset. Pure; no I/O.
    pub fn public_url(&self, name: &str) -> String {
        match &self.public_origin {
            Some(origin) => format!("{}/static/{}", origin, name),
            None => format!("/static/{}", name),
        }
    }

    /// Map a stored name to its on-disk path, rejecting traversal attempts
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return None;
        }
        Some(self.media_dir.join(name))
    }
}

/// Best-effort normalization of a freshly written image file: apply EXIF
/// orientation, stretch contrast, sharpen lightly, bound the longest edge,
/// and re-encode in a single RGB color encoding.
fn normalize_image(path: &Path) -> Result<()> {
    let bytes = std::fs::read(path)?;

    let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);

    let mut rgb = img.to_rgb8();
    stretch_contrast(&mut rgb);
    let rgb = image::imageops::unsharpen(&rgb, UNSHARP_SIGMA, UNSHARP_THRESHOLD);

    let mut img = DynamicImage::ImageRgb8(rgb);
    if img.width().max(img.height()) > MAX_DIMENSION {
        img = img.thumbnail(MAX_DIMENSION, MAX_DIMENSION);
    }
    let rgb = img.into_rgb8();

    // Encode fully in memory so a failure here cannot clobber the raw file.
    let mut encoded = Vec::new();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") | None => {
            JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY).encode_image(&rgb)?;
        }
        _ => {
            let format = ImageFormat::from_path(path)?;
            rgb.write_to(&mut Cursor::new(&mut encoded), format)?;
        }
    }

    std::fs::write(path, encoded)?;
    Ok(())
}

/// Linear contrast stretch across all channels (auto-contrast)
fn stretch_contrast(img: &mut RgbImage) {
    let mut lo = u8::MAX;
    let mut hi = u8::MIN;
    for pixel in img.pixels() {
        for &channel in pixel.0.iter() {
            lo = lo.min(channel);
            hi = hi.max(channel);
        }
    }

    // Already full range, or a flat image with nothing to stretch.
    if (lo == 0 && hi == u8::MAX) || lo >= hi {
        return;
    }

    let range = (hi - lo) as f32;
    for pixel in img.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = (((*channel - lo) as f32 / range) * 255.0).round() as u8;
        }
    }
}
