use crate::constants::{COMMUNITY_RSS_ORGANIZER, COMMUNITY_RSS_SOURCE};
use crate::error::{Result, ScraperError};
use crate::feeds::rss::parse_rss;
use crate::fetch::Fetcher;
use crate::heuristics::dates::parse_structured_date;
use crate::heuristics::prices::SEE_WEBSITE;
use crate::heuristics::text::strip_html;
use crate::listing::{ListingType, NaturalKey};
use crate::types::{ExtractedFields, RawItem, SourceAdapter, SourceConfig};
use serde_json::json;
use tracing::{info, instrument};

const FEED_URL: &str = "https://calendar.example.org/events/rss";

const CONFIG: SourceConfig = SourceConfig {
    source_name: COMMUNITY_RSS_SOURCE,
    organizer: COMMUNITY_RSS_ORGANIZER,
    default_price: Some(SEE_WEBSITE),
    default_type: ListingType::Event,
    default_age_range: None,
    base_tags: &["Community"],
    place_type: None,
};

/// Community calendar RSS feed. Items are keyed by GUID; items without one
/// fall back to the link, still a single key kind for the source.
pub struct CommunityRssCrawler {
    fetcher: Fetcher,
    feed_url: String,
}

impl CommunityRssCrawler {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            feed_url: FEED_URL.to_string(),
        }
    }

    pub fn items_from_feed(feed: &str) -> Vec<RawItem> {
        parse_rss(feed)
            .into_iter()
            .map(|item| {
                let location = item.location.unwrap_or_default();
                json!({
                    "guid": item.guid,
                    "link": item.link,
                    "title": item.title,
                    "description": item.description,
                    "start_local": item.start_date_local,
                    "street": location.street,
                    "city": location.city,
                    "state": location.state,
                    "zip": location.zip,
                    "lat": location.latitude,
                    "lng": location.longitude,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for CommunityRssCrawler {
    fn source_name(&self) -> &'static str {
        COMMUNITY_RSS_SOURCE
    }

    fn static_config(&self) -> &SourceConfig {
        &CONFIG
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        let feed = self.fetcher.get_text(&self.feed_url).await?;
        let items = Self::items_from_feed(&feed);
        info!("Parsed {} items from community feed", items.len());
        Ok(items)
    }

    async fn extract_fields(&self, item: &RawItem) -> Result<ExtractedFields> {
        let guid = item["guid"]
            .as_str()
            .or_else(|| item["link"].as_str())
            .ok_or_else(|| ScraperError::MissingField("guid or link not found".into()))?;

        Ok(ExtractedFields {
            natural_key: Some(NaturalKey::RssGuid(guid.to_string())),
            title: item["title"].as_str().map(str::to_string),
            description: item["description"].as_str().map(strip_html),
            start_date: item["start_local"].as_str().and_then(parse_structured_date),
            street: item["street"].as_str().map(str::to_string),
            city: item["city"].as_str().map(str::to_string),
            state: item["state"].as_str().map(str::to_string),
            zip: item["zip"].as_str().map(str::to_string),
            latitude: item["lat"].as_f64(),
            longitude: item["lng"].as_f64(),
            website: item["link"].as_str().map(str::to_string),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<rss xmlns:ev="https://calendar.example.org/ns/events"><channel>
<item>
  <title>Puppet Theater in the Plaza</title>
  <link>https://calendar.example.org/events/puppets</link>
  <guid>evt-77</guid>
  <description><![CDATA[<p>Free <b>puppet</b> show for all ages.</p>]]></description>
  <ev:startdate>2026-01-17T11:00:00</ev:startdate>
  <ev:location>
    <ev:street>1 Plaza Way</ev:street><ev:city>San Rafael</ev:city>
    <ev:state>CA</ev:state><ev:zip>94901</ev:zip>
  </ev:location>
</item>
<item>
  <title>No Guid Event</title>
  <link>https://calendar.example.org/events/noguid</link>
</item>
</channel></rss>"#;

    #[tokio::test]
    async fn namespaced_fields_flow_through() {
        let crawler =
            CommunityRssCrawler::new(Fetcher::new(&crate::config::IngestConfig::default()));
        let items = CommunityRssCrawler::items_from_feed(FEED);
        let fields = crawler.extract_fields(&items[0]).await.unwrap();

        assert_eq!(fields.natural_key.as_ref().unwrap().value(), "evt-77");
        assert_eq!(fields.city.as_deref(), Some("San Rafael"));
        assert_eq!(
            fields.description.as_deref(),
            Some("Free puppet show for all ages.")
        );
        // January start gets the winter offset
        let start = fields.start_date.unwrap();
        assert_eq!(start.to_rfc3339(), "2026-01-17T11:00:00-08:00");
    }

    #[tokio::test]
    async fn guid_falls_back_to_link() {
        let crawler =
            CommunityRssCrawler::new(Fetcher::new(&crate::config::IngestConfig::default()));
        let items = CommunityRssCrawler::items_from_feed(FEED);
        let fields = crawler.extract_fields(&items[1]).await.unwrap();
        assert_eq!(
            fields.natural_key.as_ref().unwrap().value(),
            "https://calendar.example.org/events/noguid"
        );
    }
}
