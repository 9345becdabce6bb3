use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use faf_scraper::error::{Result as ScrapeResult, ScraperError};
use faf_scraper::listing::{ListingType, NaturalKey};
use faf_scraper::pipeline::{Pipeline, RunOptions};
use faf_scraper::storage::{InMemoryStore, ListingStore};
use faf_scraper::types::{ExtractedFields, RawItem, SourceAdapter, SourceConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const TEST_CONFIG: SourceConfig = SourceConfig {
    source_name: "fixture",
    organizer: "Fixture Organizer",
    default_price: Some("Free"),
    default_type: ListingType::Event,
    default_age_range: Some("0-12"),
    base_tags: &["Fixture"],
    place_type: Some("Museum"),
};

/// Adapter that serves canned items. Items are plain objects; a few magic
/// shapes drive the failure/skip paths:
///   {"boom": true}        -> extraction error
///   missing "url"         -> no natural key
///   missing "title"       -> no title
///   "days_offset": n      -> start date n days from now (may be negative)
struct FixtureSource {
    items: Vec<RawItem>,
}

#[async_trait::async_trait]
impl SourceAdapter for FixtureSource {
    fn source_name(&self) -> &'static str {
        "fixture"
    }

    fn static_config(&self) -> &SourceConfig {
        &TEST_CONFIG
    }

    async fn fetch_items(&self) -> ScrapeResult<Vec<RawItem>> {
        Ok(self.items.clone())
    }

    async fn extract_fields(&self, item: &RawItem) -> ScrapeResult<ExtractedFields> {
        if item.get("boom").is_some() {
            return Err(ScraperError::Source {
                message: "fixture explosion".to_string(),
            });
        }
        let start_date = item
            .get("days_offset")
            .and_then(Value::as_i64)
            .map(|days| (Utc::now() + ChronoDuration::days(days)).fixed_offset());
        Ok(ExtractedFields {
            natural_key: item
                .get("url")
                .and_then(Value::as_str)
                .map(|u| NaturalKey::Website(u.to_string())),
            title: item
                .get("title")
                .and_then(Value::as_str)
                .map(str::to_string),
            description: item
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            start_date,
            price: item
                .get("price")
                .and_then(Value::as_str)
                .map(str::to_string),
            website: item
                .get("url")
                .and_then(Value::as_str)
                .map(str::to_string),
            ..Default::default()
        })
    }
}

fn fast_options() -> RunOptions {
    RunOptions {
        dry_run: false,
        limit: None,
        delay: Duration::from_millis(0),
    }
}

fn upcoming_item(url: &str, title: &str) -> RawItem {
    json!({ "url": url, "title": title, "days_offset": 14 })
}

#[tokio::test]
async fn first_run_creates_second_run_updates() -> Result<()> {
    let adapter = FixtureSource {
        items: vec![
            upcoming_item("https://e.org/a", "Art for Tots"),
            upcoming_item("https://e.org/b", "Bug Safari"),
        ],
    };
    let store = Arc::new(InMemoryStore::new());
    let options = fast_options();

    let first = Pipeline::run_for_source(&adapter, store.clone(), &options).await?;
    assert_eq!(first.created, 2);
    assert_eq!(first.updated, 0);
    assert!(first.errors.is_empty());

    let second = Pipeline::run_for_source(&adapter, store.clone(), &options).await?;
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 2);

    // Reprocessing must not duplicate rows
    let rows = store.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].fields["organizer"], "Fixture Organizer");
    assert_eq!(rows[0].fields["price"], "Free");
    Ok(())
}

#[tokio::test]
async fn skip_policy_filters_unusable_items() -> Result<()> {
    let adapter = FixtureSource {
        items: vec![
            json!({ "title": "No Key Here", "days_offset": 7 }),
            json!({ "url": "https://e.org/untitled", "days_offset": 7 }),
            json!({ "url": "https://e.org/blank", "title": "   ", "days_offset": 7 }),
            json!({ "url": "https://e.org/past", "title": "Already Over", "days_offset": -3 }),
            upcoming_item("https://e.org/keep", "Keeper"),
        ],
    };
    let store = Arc::new(InMemoryStore::new());

    let summary = Pipeline::run_for_source(&adapter, store.clone(), &fast_options()).await?;
    assert_eq!(summary.total_items, 5);
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.created, 1);

    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields["title"], "Keeper");
    Ok(())
}

#[tokio::test]
async fn undated_items_are_kept() -> Result<()> {
    // Standing activities have no start date and must never hit the
    // past-event filter.
    let adapter = FixtureSource {
        items: vec![json!({ "url": "https://e.org/open-gym", "title": "Open Gym" })],
    };
    let store = Arc::new(InMemoryStore::new());

    let summary = Pipeline::run_for_source(&adapter, store.clone(), &fast_options()).await?;
    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 0);
    Ok(())
}

#[tokio::test]
async fn extraction_failure_is_counted_and_run_continues() -> Result<()> {
    let adapter = FixtureSource {
        items: vec![
            json!({ "boom": true }),
            upcoming_item("https://e.org/ok", "Survivor"),
        ],
    };
    let store = Arc::new(InMemoryStore::new());

    let summary = Pipeline::run_for_source(&adapter, store.clone(), &fast_options()).await?;
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("extraction failed"));
    assert_eq!(summary.created, 1);
    Ok(())
}

#[tokio::test]
async fn limit_caps_processed_items() -> Result<()> {
    let adapter = FixtureSource {
        items: vec![
            upcoming_item("https://e.org/1", "One"),
            upcoming_item("https://e.org/2", "Two"),
            upcoming_item("https://e.org/3", "Three"),
        ],
    };
    let store = Arc::new(InMemoryStore::new());
    let options = RunOptions {
        limit: Some(2),
        ..fast_options()
    };

    let summary = Pipeline::run_for_source(&adapter, store.clone(), &options).await?;
    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.created, 2);
    assert_eq!(store.rows().len(), 2);
    Ok(())
}

#[tokio::test]
async fn dry_run_reports_without_writing() -> Result<()> {
    let adapter = FixtureSource {
        items: vec![
            upcoming_item("https://e.org/a", "Art for Tots"),
            upcoming_item("https://e.org/b", "Bug Safari"),
        ],
    };
    let store = Arc::new(InMemoryStore::new());

    // Seed one of the two so the dry run has both outcomes to report.
    let seeded = Pipeline::run_for_source(
        &FixtureSource {
            items: vec![upcoming_item("https://e.org/a", "Art for Tots")],
        },
        store.clone(),
        &fast_options(),
    )
    .await?;
    assert_eq!(seeded.created, 1);

    let options = RunOptions {
        dry_run: true,
        ..fast_options()
    };
    let summary = Pipeline::run_for_source(&adapter, store.clone(), &options).await?;
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(store.rows().len(), 1, "dry run must not write");
    Ok(())
}

#[tokio::test]
async fn fetch_failure_aborts_the_run() {
    struct BrokenSource;

    #[async_trait::async_trait]
    impl SourceAdapter for BrokenSource {
        fn source_name(&self) -> &'static str {
            "broken"
        }
        fn static_config(&self) -> &SourceConfig {
            &TEST_CONFIG
        }
        async fn fetch_items(&self) -> ScrapeResult<Vec<RawItem>> {
            Err(ScraperError::Fetch {
                message: "listing page unreachable".to_string(),
            })
        }
        async fn extract_fields(&self, _item: &RawItem) -> ScrapeResult<ExtractedFields> {
            Ok(ExtractedFields::default())
        }
    }

    let store: Arc<dyn ListingStore> = Arc::new(InMemoryStore::new());
    let result = Pipeline::run_for_source(&BrokenSource, store, &fast_options()).await;
    assert!(result.is_err());
}
