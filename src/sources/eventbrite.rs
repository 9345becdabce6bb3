use crate::constants::EVENTBRITE_SOURCE;
use crate::error::{Result, ScraperError};
use crate::fetch::Fetcher;
use crate::heuristics::dates::stamp_pacific;
use crate::heuristics::prices::{price_from_range, FREE, SEE_WEBSITE};
use crate::listing::{ListingType, NaturalKey};
use crate::types::{ExtractedFields, RawItem, SourceAdapter, SourceConfig};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::{info, instrument, warn};

const SEARCH_URL: &str = "https://www.eventbrite.com/d/ca--san-francisco/family-and-education--events/";

/// The search page embeds its results as a JavaScript variable assignment.
const SERVER_DATA_MARKER: &str = "window.__SERVER_DATA__ =";

const CONFIG: SourceConfig = SourceConfig {
    source_name: EVENTBRITE_SOURCE,
    organizer: "Eventbrite",
    default_price: Some(SEE_WEBSITE),
    default_type: ListingType::Event,
    default_age_range: None,
    base_tags: &["Eventbrite"],
    place_type: None,
};

/// Eventbrite family-events search. Each results page carries a paginated
/// JSON payload inline in the HTML; the event URL is the natural key.
pub struct EventbriteCrawler {
    fetcher: Fetcher,
    page_cap: usize,
}

impl EventbriteCrawler {
    pub fn new(fetcher: Fetcher, page_cap: usize) -> Self {
        Self { fetcher, page_cap }
    }

    /// Pulls the embedded server-data object out of a results page by
    /// locating the assignment marker and brace-matching to its end.
    pub fn embedded_server_data(body: &str) -> Option<Value> {
        let start = body.find(SERVER_DATA_MARKER)? + SERVER_DATA_MARKER.len();
        let rest = body[start..].trim_start();
        let json_str = match_braces(rest)?;
        serde_json::from_str(json_str).ok()
    }

    /// Results plus the source-declared page count from one page's payload.
    pub fn parse_page(body: &str) -> (Vec<RawItem>, Option<usize>) {
        let Some(data) = Self::embedded_server_data(body) else {
            warn!("No embedded server data found on results page");
            return (Vec::new(), None);
        };
        let events = &data["search_data"]["events"];
        let items = events["results"]
            .as_array()
            .map(|results| results.to_vec())
            .unwrap_or_default();
        let page_count = events["pagination"]["page_count"]
            .as_u64()
            .map(|count| count as usize);
        (items, page_count)
    }

    fn parse_start(result: &Value) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        let date = result["start_date"].as_str()?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let time = result["start_time"]
            .as_str()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
            .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        Some(stamp_pacific(NaiveDateTime::new(date, time)))
    }

    fn parse_price(result: &Value) -> Option<String> {
        if result["is_free"].as_bool() == Some(true) {
            return Some(FREE.to_string());
        }
        let availability = &result["ticket_availability"];
        let low = availability["minimum_ticket_price"]["major_value"]
            .as_str()
            .and_then(|v| v.parse::<f64>().ok())?;
        let high = availability["maximum_ticket_price"]["major_value"]
            .as_str()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(low);
        Some(price_from_range(low, high))
    }
}

/// Returns the balanced `{...}` prefix of `rest`, respecting strings.
fn match_braces(rest: &str) -> Option<&str> {
    if !rest.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[async_trait::async_trait]
impl SourceAdapter for EventbriteCrawler {
    fn source_name(&self) -> &'static str {
        EVENTBRITE_SOURCE
    }

    fn static_config(&self) -> &SourceConfig {
        &CONFIG
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        let items = self
            .fetcher
            .fetch_paginated(
                |page| format!("{}?page={}", SEARCH_URL, page),
                self.page_cap,
                Self::parse_page,
            )
            .await?;
        info!("Collected {} search results", items.len());
        Ok(items)
    }

    async fn extract_fields(&self, item: &RawItem) -> Result<ExtractedFields> {
        let url = item["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("url not found".into()))?;
        let address = &item["primary_venue"]["address"];

        Ok(ExtractedFields {
            natural_key: Some(NaturalKey::Website(url.to_string())),
            title: item["name"].as_str().map(str::to_string),
            description: item["summary"].as_str().map(str::to_string),
            start_date: Self::parse_start(item),
            price: Self::parse_price(item),
            location_name: item["primary_venue"]["name"].as_str().map(str::to_string),
            street: address["address_1"].as_str().map(str::to_string),
            city: address["city"].as_str().map(str::to_string),
            state: address["region"].as_str().map(str::to_string),
            zip: address["postal_code"].as_str().map(str::to_string),
            website: Some(url.to_string()),
            image: item["image"]["url"].as_str().map(str::to_string),
            ..Default::default()
        })
    }
}
