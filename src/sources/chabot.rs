use crate::constants::{CHABOT_ORGANIZER, CHABOT_SOURCE};
use crate::error::{Result, ScraperError};
use crate::fetch::PageRenderer;
use crate::heuristics::dates::parse_free_text_date;
use crate::heuristics::prices::SEE_WEBSITE;
use crate::heuristics::text::origin_of;
use crate::listing::{ListingType, NaturalKey};
use crate::types::{ExtractedFields, RawItem, SourceAdapter, SourceConfig};
use chrono::Utc;
use scraper::{Html, Selector};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const CALENDAR_URL: &str = "https://chabotspace.org/calendar/";

const CONFIG: SourceConfig = SourceConfig {
    source_name: CHABOT_SOURCE,
    organizer: CHABOT_ORGANIZER,
    default_price: Some(SEE_WEBSITE),
    default_type: ListingType::Event,
    default_age_range: None,
    base_tags: &["Chabot", "STEM"],
    place_type: Some("Museum"),
};

/// Chabot Space & Science Center. The calendar is a client-side app, so
/// the item list comes from an injected `PageRenderer` snapshot rather
/// than a plain GET; everything after that is ordinary DOM scraping.
pub struct ChabotCrawler {
    renderer: Arc<dyn PageRenderer>,
}

impl ChabotCrawler {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self { renderer }
    }

    /// Pulls per-card fields out of a rendered calendar snapshot. Kept
    /// separate from the renderer so it runs against static HTML fixtures.
    pub fn parse_calendar(html: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);
        let Ok(card_selector) = Selector::parse("div.calendar-event") else {
            return Vec::new();
        };
        let title_selector = Selector::parse("h3").ok();
        let date_selector = Selector::parse(".event-when").ok();
        let link_selector = Selector::parse("a").ok();
        let origin = origin_of(CALENDAR_URL);

        let mut items = Vec::new();
        for card in document.select(&card_selector) {
            let title = title_selector.as_ref().and_then(|s| {
                card.select(s)
                    .next()
                    .map(|h| h.text().collect::<String>().trim().to_string())
            });
            let date_text = date_selector.as_ref().and_then(|s| {
                card.select(s)
                    .next()
                    .map(|d| d.text().collect::<String>().trim().to_string())
            });
            let url = link_selector.as_ref().and_then(|s| {
                card.select(s)
                    .next()
                    .and_then(|a| a.value().attr("href"))
                    .map(|href| {
                        if href.starts_with('/') {
                            format!("{}{}", origin, href)
                        } else {
                            href.to_string()
                        }
                    })
            });

            items.push(json!({
                "title": title,
                "date_text": date_text,
                "url": url,
            }));
        }
        items
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ChabotCrawler {
    fn source_name(&self) -> &'static str {
        CHABOT_SOURCE
    }

    fn static_config(&self) -> &SourceConfig {
        &CONFIG
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        let html = self.renderer.render(CALENDAR_URL).await?;
        let items = Self::parse_calendar(&html);
        info!("Rendered calendar yielded {} cards", items.len());
        if items.is_empty() {
            warn!("No calendar cards found - the rendered page structure may have changed");
        }
        Ok(items)
    }

    async fn extract_fields(&self, item: &RawItem) -> Result<ExtractedFields> {
        let url = item["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("url not found".into()))?;

        let start_date = item["date_text"]
            .as_str()
            .and_then(|text| parse_free_text_date(text, Utc::now().date_naive()));

        Ok(ExtractedFields {
            natural_key: Some(NaturalKey::Website(url.to_string())),
            title: item["title"].as_str().map(str::to_string),
            start_date,
            website: Some(url.to_string()),
            ..Default::default()
        })
    }
}
