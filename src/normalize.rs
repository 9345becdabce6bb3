use crate::error::{Result, ScraperError};
use crate::heuristics::tags::{classify_place_type, infer_tags};
use crate::listing::{Listing, NaturalKey};
use crate::types::{ExtractedFields, SourceConfig};
use sha2::{Digest, Sha256};

/// Deterministic generated key for sources with no stable upstream
/// identifier: `<prefix>_<hash-of-seed>`. The same seed always yields the
/// same key.
pub fn generated_source_id(prefix: &str, seed: &str) -> NaturalKey {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = hex::encode(hasher.finalize());
    NaturalKey::SourceId(format!("{}_{}", prefix, &digest[..12]))
}

/// Maps extracted fields plus the source's static configuration into a
/// canonical listing. Pure; no I/O. A missing title is an error here, not
/// a placeholder; the run driver skips the item before any write.
pub fn normalize(fields: &ExtractedFields, config: &SourceConfig) -> Result<Listing> {
    let natural_key = fields
        .natural_key
        .clone()
        .ok_or_else(|| ScraperError::MissingField("natural key".into()))?;
    let title = fields
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ScraperError::MissingField("title".into()))?
        .to_string();

    let listing_type = fields.listing_type.unwrap_or(config.default_type);
    let price = fields
        .price
        .clone()
        .or_else(|| config.default_price.map(str::to_string));
    let age_range = fields
        .age_range
        .clone()
        .or_else(|| config.default_age_range.map(str::to_string));

    let tags = infer_tags(&title, fields.description.as_deref(), config.base_tags).join(",");

    // The source-level place_type constant fills the upstream-category slot
    // of the classification ladder when the extractor found none.
    let category = fields
        .category
        .clone()
        .or_else(|| config.place_type.map(str::to_string));
    let place_type = classify_place_type(
        category.as_deref(),
        fields.legacy_type.as_deref(),
        fields.location_name.as_deref(),
        &title,
        fields.description.as_deref(),
    );

    Ok(Listing {
        natural_key,
        title,
        listing_type,
        description: fields.description.clone(),
        start_date: fields.start_date,
        location_name: fields.location_name.clone(),
        street: fields.street.clone(),
        city: fields.city.clone(),
        state: fields.state.clone(),
        zip: fields.zip.clone(),
        latitude: fields.latitude,
        longitude: fields.longitude,
        price,
        age_range,
        organizer: Some(config.organizer.to_string()),
        website: fields.website.clone(),
        image: fields.image.clone(),
        tags,
        place_type: Some(place_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingType;

    fn config() -> SourceConfig {
        SourceConfig {
            source_name: "fixture",
            organizer: "Fixture Org",
            default_price: Some("Free"),
            default_type: ListingType::Event,
            default_age_range: Some("All ages"),
            base_tags: &["Fixture"],
            place_type: Some("Museum"),
        }
    }

    #[test]
    fn defaults_fill_unextracted_fields() {
        let fields = ExtractedFields {
            natural_key: Some(NaturalKey::Website("https://e.org/1".into())),
            title: Some("Family Day".into()),
            ..Default::default()
        };
        let listing = normalize(&fields, &config()).unwrap();
        assert_eq!(listing.price.as_deref(), Some("Free"));
        assert_eq!(listing.age_range.as_deref(), Some("All ages"));
        assert_eq!(listing.organizer.as_deref(), Some("Fixture Org"));
        assert_eq!(listing.place_type.as_deref(), Some("Museum"));
    }

    #[test]
    fn extracted_values_beat_defaults() {
        let fields = ExtractedFields {
            natural_key: Some(NaturalKey::Website("https://e.org/1".into())),
            title: Some("Family Day".into()),
            price: Some("$10".into()),
            category: Some("Park".into()),
            ..Default::default()
        };
        let listing = normalize(&fields, &config()).unwrap();
        assert_eq!(listing.price.as_deref(), Some("$10"));
        assert_eq!(listing.place_type.as_deref(), Some("Park"));
    }

    #[test]
    fn missing_title_is_an_error_not_a_placeholder() {
        let fields = ExtractedFields {
            natural_key: Some(NaturalKey::Website("https://e.org/1".into())),
            ..Default::default()
        };
        assert!(matches!(
            normalize(&fields, &config()),
            Err(ScraperError::MissingField(_))
        ));
    }

    #[test]
    fn generated_keys_are_stable() {
        let a = generated_source_id("parks", "/events/summer-splash");
        let b = generated_source_id("parks", "/events/summer-splash");
        assert_eq!(a, b);
        let key = a.value().to_string();
        assert!(key.starts_with("parks_"));
        assert_eq!(key.len(), "parks_".len() + 12);
    }
}
