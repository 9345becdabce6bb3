use crate::error::Result;
use crate::listing::{ListingType, NaturalKey};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Raw item data as returned from source listing pages and feeds.
pub type RawItem = serde_json::Value;

/// Static per-source configuration applied by the normalizer for any field
/// the extractor could not determine.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source_name: &'static str,
    pub organizer: &'static str,
    pub default_price: Option<&'static str>,
    pub default_type: ListingType,
    pub default_age_range: Option<&'static str>,
    /// Constant tags always appended, including the source-identifying tag.
    pub base_tags: &'static [&'static str],
    pub place_type: Option<&'static str>,
}

/// Best-effort bag of typed fields pulled from one item. Every field is
/// optional; a failed extraction of one field never blocks the others.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub natural_key: Option<NaturalKey>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub price: Option<String>,
    pub location_name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub age_range: Option<String>,
    pub website: Option<String>,
    pub image: Option<String>,
    /// Upstream category field, consulted first by place_type classification.
    pub category: Option<String>,
    /// Free-text legacy type field, consulted second.
    pub legacy_type: Option<String>,
    pub listing_type: Option<ListingType>,
}

/// Write outcome from the reconciler. Skips and per-item errors never
/// reach a write; the run driver counts those directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Created,
    Updated,
}

/// Capability interface every source implements. The run driver stays
/// source-agnostic: it only sees this trait plus the static config.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier for this source.
    fn source_name(&self) -> &'static str;

    /// Constant overrides (organizer, defaults, base tags) for this source.
    fn static_config(&self) -> &SourceConfig;

    /// Fetch the source's current item list. Items are processed in the
    /// order returned here.
    async fn fetch_items(&self) -> Result<Vec<RawItem>>;

    /// Extract typed fields for one item. May perform follow-up fetches
    /// (detail pages); the driver's rate-limit delay covers those calls.
    async fn extract_fields(&self, item: &RawItem) -> Result<ExtractedFields>;
}
