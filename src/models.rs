//! Data models for the artisan catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered maker profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artisan {
    /// Store-assigned identifier
    pub id: i64,

    pub name: String,
    pub location: String,

    /// Source language of the submitted biography
    pub language: String,

    /// Digits-only contact number; empty when not supplied
    pub contact_number: String,

    /// User-submitted raw biography text
    pub bio_original: String,

    /// Biography translated to the marketplace language
    pub bio_translated: String,

    /// Stylistically enriched biography for listings
    pub bio_enriched: String,

    /// When this profile was created
    pub created_at: DateTime<Utc>,
}

/// A listed item owned by one artisan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier
    pub id: i64,

    /// Owning artisan; resolved at creation time
    pub artisan_id: i64,

    pub name: String,
    pub description: String,

    /// Opaque display string; may carry currency symbols
    pub price: String,

    /// Bare filename of the stored image asset, never a full path
    pub image_path: String,

    /// When this listing was created
    pub created_at: DateTime<Utc>,
}

/// Biography text in original and derived forms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BioText {
    pub original: String,
    pub translated: String,
    pub enriched: String,
}

/// Fields for creating an artisan; derived bios are produced by the caller
#[derive(Debug, Clone)]
pub struct NewArtisan {
    pub name: String,
    pub location: String,
    pub language: String,
    pub contact_number: String,
    pub bio: BioText,
}

/// Partial update of an artisan; `None` fields keep their prior value
#[derive(Debug, Clone, Default)]
pub struct ArtisanPatch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub contact_number: Option<String>,
    pub bio: Option<BioText>,
}

/// Fields for creating a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub artisan_id: i64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_path: String,
}

/// Partial update of a product; `None` fields keep their prior value
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image_path: Option<String>,
}

impl Artisan {
    /// Create a new artisan record from validated fields
    pub fn new(id: i64, fields: NewArtisan) -> Self {
        Self {
            id,
            name: fields.name,
            location: fields.location,
            language: fields.language,
            contact_number: fields.contact_number,
            bio_original: fields.bio.original,
            bio_translated: fields.bio.translated,
            bio_enriched: fields.bio.enriched,
            created_at: Utc::now(),
        }
    }

    /// Apply a partial update; omitted fields retain their prior value
    pub fn apply(&mut self, patch: ArtisanPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(contact_number) = patch.contact_number {
            self.contact_number = contact_number;
        }
        if let Some(bio) = patch.bio {
            self.bio_original = bio.original;
            self.bio_translated = bio.translated;
            self.bio_enriched = bio.enriched;
        }
    }
}

impl Product {
    /// Create a new product record from validated fields
    pub fn new(id: i64, fields: NewProduct) -> Self {
        Self {
            id,
            artisan_id: fields.artisan_id,
            name: fields.name,
            description: fields.description,
            price: fields.price,
            image_path: fields.image_path,
            created_at: Utc::now(),
        }
    }

    /// Apply a partial update; omitted fields retain their prior value
    pub fn apply(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(image_path) = patch.image_path {
            self.image_path = image_path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artisan() -> Artisan {
        Artisan::new(
            1,
            NewArtisan {
                name: "Meera".to_string(),
                location: "Jaipur".to_string(),
                language: "Hindi".to_string(),
                contact_number: "9876543210".to_string(),
                bio: BioText {
                    original: "original".to_string(),
                    translated: "translated".to_string(),
                    enriched: "enriched".to_string(),
                },
            },
        )
    }

    #[test]
    fn test_artisan_partial_update_keeps_other_fields() {
        let mut artisan = sample_artisan();

        artisan.apply(ArtisanPatch {
            location: Some("Udaipur".to_string()),
            ..Default::default()
        });

        assert_eq!(artisan.location, "Udaipur");
        assert_eq!(artisan.name, "Meera");
        assert_eq!(artisan.language, "Hindi");
        assert_eq!(artisan.contact_number, "9876543210");
        assert_eq!(artisan.bio_original, "original");
        assert_eq!(artisan.bio_translated, "translated");
        assert_eq!(artisan.bio_enriched, "enriched");
    }

    #[test]
    fn test_artisan_bio_update_replaces_all_three_forms() {
        let mut artisan = sample_artisan();

        artisan.apply(ArtisanPatch {
            bio: Some(BioText {
                original: "new".to_string(),
                translated: "new-t".to_string(),
                enriched: "new-e".to_string(),
            }),
            ..Default::default()
        });

        assert_eq!(artisan.bio_original, "new");
        assert_eq!(artisan.bio_translated, "new-t");
        assert_eq!(artisan.bio_enriched, "new-e");
    }

    #[test]
    fn test_product_partial_update() {
        let mut product = Product::new(
            7,
            NewProduct {
                artisan_id: 1,
                name: "Blue Pot".to_string(),
                description: "Hand thrown".to_string(),
                price: "₹250".to_string(),
                image_path: "abc.jpg".to_string(),
            },
        );

        product.apply(ProductPatch {
            price: Some("₹300".to_string()),
            ..Default::default()
        });

        assert_eq!(product.price, "₹300");
        assert_eq!(product.name, "Blue Pot");
        assert_eq!(product.image_path, "abc.jpg");

        product.apply(ProductPatch {
            image_path: Some("def.jpg".to_string()),
            ..Default::default()
        });
        assert_eq!(product.image_path, "def.jpg");
    }
}
