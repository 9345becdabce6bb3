use chrono::{DateTime, FixedOffset};
use regex::Regex;

/// Postal/geo detail carried in the feed's namespaced location sub-object.
#[derive(Debug, Clone, Default)]
pub struct RssLocation {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// One feed item. `start_date_local` and `location` come from the feed's
/// `ev:` namespace extension; the rest are standard RSS 2.0 fields.
#[derive(Debug, Clone, Default)]
pub struct RssItem {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<DateTime<FixedOffset>>,
    pub start_date_local: Option<String>,
    pub location: Option<RssLocation>,
}

/// Extracts items from an RSS feed. A proper XML parser is overkill for
/// the two feeds we consume; tag-scoped regex extraction matches how the
/// upstream feeds are actually shaped.
pub fn parse_rss(xml: &str) -> Vec<RssItem> {
    item_blocks(xml)
        .into_iter()
        .map(|block| RssItem {
            guid: tag_text(block, "guid"),
            link: tag_text(block, "link"),
            title: tag_text(block, "title"),
            description: tag_text(block, "description").or_else(|| tag_text(block, "content:encoded")),
            pub_date: tag_text(block, "pubDate")
                .and_then(|d| DateTime::parse_from_rfc2822(&d).ok())
                .or_else(|| {
                    tag_text(block, "isoDate").and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
                }),
            start_date_local: tag_text(block, "ev:startdate"),
            location: parse_location(block),
        })
        .collect()
}

fn parse_location(block: &str) -> Option<RssLocation> {
    let location_block = block_text(block, "ev:location")?;
    Some(RssLocation {
        street: tag_text(&location_block, "ev:street"),
        city: tag_text(&location_block, "ev:city"),
        state: tag_text(&location_block, "ev:state"),
        zip: tag_text(&location_block, "ev:zip"),
        latitude: tag_text(&location_block, "ev:lat").and_then(|v| v.parse().ok()),
        longitude: tag_text(&location_block, "ev:lng").and_then(|v| v.parse().ok()),
    })
}

fn item_blocks(xml: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<item") {
        let after = &rest[start..];
        let Some(open_end) = after.find('>') else { break };
        let Some(close) = after.find("</item>") else { break };
        if close > open_end {
            blocks.push(&after[open_end + 1..close]);
        }
        rest = &after[close + "</item>".len()..];
    }
    blocks
}

/// First occurrence of `<tag ...>text</tag>` inside a block, with CDATA
/// wrappers and basic entities undone.
fn tag_text(block: &str, tag: &str) -> Option<String> {
    let pattern = format!("(?s)<{tag}(?:\\s[^>]*)?>(.*?)</{tag}>", tag = regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    let raw = re.captures(block)?.get(1)?.as_str();
    let text = raw
        .trim()
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw)
        .trim();
    if text.is_empty() {
        return None;
    }
    Some(
        text.replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'"),
    )
}

/// Like `tag_text` but keeps the inner markup, for nested sub-objects.
fn block_text(block: &str, tag: &str) -> Option<String> {
    let pattern = format!("(?s)<{tag}(?:\\s[^>]*)?>(.*?)</{tag}>", tag = regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    Some(re.captures(block)?.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:ev="https://calendar.example.org/ns/events">
  <channel>
    <title>Community Calendar</title>
    <item>
      <title><![CDATA[Family Fun Run & Picnic]]></title>
      <link>https://calendar.example.org/events/fun-run</link>
      <guid isPermaLink="false">evt-2041</guid>
      <description><![CDATA[<p>A morning run followed by a picnic.</p>]]></description>
      <pubDate>Tue, 02 Jun 2026 09:00:00 -0700</pubDate>
      <ev:startdate>2026-06-20T09:00:00</ev:startdate>
      <ev:location>
        <ev:street>100 Park Ave</ev:street>
        <ev:city>San Mateo</ev:city>
        <ev:state>CA</ev:state>
        <ev:zip>94401</ev:zip>
        <ev:lat>37.5630</ev:lat>
        <ev:lng>-122.3255</ev:lng>
      </ev:location>
    </item>
    <item>
      <title>Puppet Show</title>
      <link>https://calendar.example.org/events/puppets</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn splits_items_and_reads_standard_fields() {
        let items = parse_rss(FEED);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].guid.as_deref(), Some("evt-2041"));
        assert_eq!(items[0].title.as_deref(), Some("Family Fun Run & Picnic"));
        assert_eq!(items[1].title.as_deref(), Some("Puppet Show"));
        assert!(items[1].guid.is_none());
    }

    #[test]
    fn reads_namespaced_start_date_and_location() {
        let items = parse_rss(FEED);
        assert_eq!(
            items[0].start_date_local.as_deref(),
            Some("2026-06-20T09:00:00")
        );
        let location = items[0].location.as_ref().unwrap();
        assert_eq!(location.city.as_deref(), Some("San Mateo"));
        assert_eq!(location.zip.as_deref(), Some("94401"));
        assert_eq!(location.latitude, Some(37.5630));
    }

    #[test]
    fn pub_date_parses_rfc2822() {
        let items = parse_rss(FEED);
        let pub_date = items[0].pub_date.unwrap();
        assert_eq!(pub_date.offset().local_minus_utc(), -7 * 3600);
    }
}
