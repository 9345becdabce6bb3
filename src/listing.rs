use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Coarse listing kind. Events carry a specific occurrence time; activities
/// and camps are standing venues/programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingType {
    Event,
    Activity,
    Camp,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Event => "Event",
            ListingType::Activity => "Activity",
            ListingType::Camp => "Camp",
        }
    }
}

/// The field used to detect whether an incoming record already exists.
/// Each source uses exactly one key kind; lookup is exact-match only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NaturalKey {
    /// Canonical detail-page URL, matched against the `website` column.
    Website(String),
    /// Feed item GUID (or its link when no GUID is present).
    RssGuid(String),
    /// Deterministically generated `<source-prefix>_<hash-or-id>`.
    SourceId(String),
}

impl NaturalKey {
    /// Column the key is matched against in the listings table.
    pub fn column(&self) -> &'static str {
        match self {
            NaturalKey::Website(_) => "website",
            NaturalKey::RssGuid(_) => "rss_guid",
            NaturalKey::SourceId(_) => "source_id",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            NaturalKey::Website(v) | NaturalKey::RssGuid(v) | NaturalKey::SourceId(v) => v,
        }
    }
}

/// One canonical row in the listings table, as produced by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub natural_key: NaturalKey,
    pub title: String,
    pub listing_type: ListingType,
    pub description: Option<String>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub location_name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: Option<String>,
    pub age_range: Option<String>,
    pub organizer: Option<String>,
    pub website: Option<String>,
    pub image: Option<String>,
    /// Comma-joined; consumers treat it as a set (order and duplicates are
    /// not guaranteed).
    pub tags: String,
    pub place_type: Option<String>,
}

impl Listing {
    /// Flattens the listing into a column map with all unset fields
    /// stripped, so an update can never blank out previously-populated
    /// columns with this item's gaps.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();

        fields.insert(
            self.natural_key.column().to_string(),
            Value::String(self.natural_key.value().to_string()),
        );
        fields.insert("title".to_string(), Value::String(self.title.clone()));
        fields.insert(
            "type".to_string(),
            Value::String(self.listing_type.as_str().to_string()),
        );

        let mut put = |key: &str, value: Option<Value>| {
            if let Some(v) = value {
                fields.insert(key.to_string(), v);
            }
        };

        put("description", self.description.clone().map(Value::String));
        put(
            "start_date",
            self.start_date.map(|d| Value::String(d.to_rfc3339())),
        );
        put(
            "location_name",
            self.location_name.clone().map(Value::String),
        );
        put("street", self.street.clone().map(Value::String));
        put("city", self.city.clone().map(Value::String));
        put("state", self.state.clone().map(Value::String));
        put("zip", self.zip.clone().map(Value::String));
        put("latitude", self.latitude.map(|v| Value::from(v)));
        put("longitude", self.longitude.map(|v| Value::from(v)));
        put("price", self.price.clone().map(Value::String));
        put("age_range", self.age_range.clone().map(Value::String));
        put("organizer", self.organizer.clone().map(Value::String));
        put("website", self.website.clone().map(Value::String));
        put("image", self.image.clone().map(Value::String));
        put(
            "tags",
            (!self.tags.is_empty()).then(|| Value::String(self.tags.clone())),
        );
        put("place_type", self.place_type.clone().map(Value::String));

        fields
    }
}

/// A row as read back from storage: its id plus current column values.
#[derive(Debug, Clone)]
pub struct StoredListing {
    pub id: String,
    pub fields: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_fields_strips_unset_columns() {
        let listing = Listing {
            natural_key: NaturalKey::Website("https://example.com/e/1".into()),
            title: "Toddler Storytime".into(),
            listing_type: ListingType::Event,
            description: None,
            start_date: None,
            location_name: None,
            street: None,
            city: Some("Oakland".into()),
            state: None,
            zip: None,
            latitude: None,
            longitude: None,
            price: None,
            age_range: None,
            organizer: None,
            website: Some("https://example.com/e/1".into()),
            image: None,
            tags: String::new(),
            place_type: None,
        };

        let fields = listing.to_fields();
        assert_eq!(fields["title"], "Toddler Storytime");
        assert_eq!(fields["city"], "Oakland");
        assert!(!fields.contains_key("description"));
        assert!(!fields.contains_key("price"));
        assert!(!fields.contains_key("tags"));
    }

    #[test]
    fn natural_key_maps_to_its_column() {
        assert_eq!(NaturalKey::Website("x".into()).column(), "website");
        assert_eq!(NaturalKey::RssGuid("x".into()).column(), "rss_guid");
        assert_eq!(NaturalKey::SourceId("x".into()).column(), "source_id");
    }
}
