use crate::error::{Result, ScraperError};
use crate::pipeline::RunOptions;
use crate::storage::ListingStore;
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One candidate image from the photo-search API.
#[derive(Debug, Clone)]
pub struct PhotoCandidate {
    pub id: String,
    pub url: String,
    pub photographer: String,
}

/// Photo-search capability, injected so the enrichment pass can run
/// against a test double.
#[async_trait::async_trait]
pub trait PhotoSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<PhotoCandidate>>;
}

/// Unsplash search client. Config via env: UNSPLASH_ACCESS_KEY.
pub struct UnsplashClient {
    client: reqwest::Client,
    access_key: String,
}

impl UnsplashClient {
    pub fn from_env() -> Result<Self> {
        let access_key = std::env::var("UNSPLASH_ACCESS_KEY")?;
        Ok(Self {
            client: reqwest::Client::new(),
            access_key,
        })
    }
}

#[async_trait::async_trait]
impl PhotoSearch for UnsplashClient {
    async fn search(&self, query: &str) -> Result<Vec<PhotoCandidate>> {
        let response = self
            .client
            .get("https://api.unsplash.com/search/photos")
            .query(&[("query", query), ("per_page", "10")])
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch {
                message: format!("photo search returned status {}", status.as_u16()),
            });
        }
        let body: Value = response.json().await?;
        let candidates = body["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .filter_map(|photo| {
                        Some(PhotoCandidate {
                            id: photo["id"].as_str()?.to_string(),
                            url: photo["urls"]["regular"].as_str()?.to_string(),
                            photographer: photo["user"]["name"].as_str().unwrap_or("").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(candidates)
    }
}

/// Result of one enrichment pass.
#[derive(Debug, Serialize)]
pub struct EnrichSummary {
    pub total: usize,
    pub assigned: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Backfills images for listings missing one. The used-photo set is
/// rebuilt from the table at the start of each pass and grown in memory as
/// photos are assigned, so no stock photo lands on two listings.
#[instrument(skip(store, photos, options))]
pub async fn enrich_images(
    store: Arc<dyn ListingStore>,
    photos: Arc<dyn PhotoSearch>,
    options: &RunOptions,
) -> Result<EnrichSummary> {
    counter!("faf_enrich_runs_total").increment(1);

    let mut used: HashSet<String> = store.used_photo_ids().await?;
    let limit = options.limit.unwrap_or(usize::MAX);
    let listings = store.listings_missing_image(limit).await?;
    info!("Found {} listings missing an image", listings.len());

    let mut assigned = 0usize;
    let mut skipped = 0usize;
    let mut errors: Vec<String> = Vec::new();

    for (i, listing) in listings.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(options.delay).await;
        }

        let title = listing
            .fields
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("");
        if title.is_empty() {
            skipped += 1;
            continue;
        }
        let place_type = listing
            .fields
            .get("place_type")
            .and_then(Value::as_str)
            .unwrap_or("");
        let query = format!("{} {}", title, place_type).trim().to_string();

        let candidates = match photos.search(&query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Photo search failed for {}: {}", listing.id, e);
                errors.push(format!("{}: search failed: {}", listing.id, e));
                continue;
            }
        };

        let Some(photo) = candidates.into_iter().find(|c| !used.contains(&c.id)) else {
            debug!("No unused photo for {}", listing.id);
            skipped += 1;
            continue;
        };

        if options.dry_run {
            println!("   [dry run] {} -> photo {}", listing.id, photo.id);
            used.insert(photo.id);
            assigned += 1;
            continue;
        }

        match store
            .set_listing_image(&listing.id, &photo.url, &photo.id, &photo.photographer)
            .await
        {
            Ok(()) => {
                used.insert(photo.id);
                assigned += 1;
            }
            Err(e) => {
                errors.push(format!("{}: write failed: {}", listing.id, e));
            }
        }
    }

    counter!("faf_images_assigned_total").increment(assigned as u64);

    Ok(EnrichSummary {
        total: listings.len(),
        assigned,
        skipped,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use serde_json::Map;
    use std::time::Duration;

    struct FixedPhotos(Vec<PhotoCandidate>);

    #[async_trait::async_trait]
    impl PhotoSearch for FixedPhotos {
        async fn search(&self, _query: &str) -> Result<Vec<PhotoCandidate>> {
            Ok(self.0.clone())
        }
    }

    fn row(title: &str, key: &str) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("website".into(), Value::String(key.into()));
        fields.insert("title".into(), Value::String(title.into()));
        fields
    }

    fn options() -> RunOptions {
        RunOptions {
            delay: Duration::from_millis(0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_photo_is_assigned_twice_in_one_pass() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_listing(&row("Zoo Day", "https://e/1")).await.unwrap();
        store.insert_listing(&row("Zoo Night", "https://e/2")).await.unwrap();

        let photos = Arc::new(FixedPhotos(vec![
            PhotoCandidate {
                id: "ph_a".into(),
                url: "https://img/a".into(),
                photographer: "A".into(),
            },
            PhotoCandidate {
                id: "ph_b".into(),
                url: "https://img/b".into(),
                photographer: "B".into(),
            },
        ]));

        let summary = enrich_images(store.clone(), photos, &options()).await.unwrap();
        assert_eq!(summary.assigned, 2);

        let rows = store.rows();
        assert_eq!(rows[0].fields["unsplash_photo_id"], "ph_a");
        assert_eq!(rows[1].fields["unsplash_photo_id"], "ph_b");
    }

    #[tokio::test]
    async fn previously_used_photos_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let mut existing = row("Old", "https://e/0");
        existing.insert("image".into(), Value::String("https://img/a".into()));
        existing.insert("unsplash_photo_id".into(), Value::String("ph_a".into()));
        store.insert_listing(&existing).await.unwrap();
        store.insert_listing(&row("New", "https://e/1")).await.unwrap();

        let photos = Arc::new(FixedPhotos(vec![
            PhotoCandidate {
                id: "ph_a".into(),
                url: "https://img/a".into(),
                photographer: "A".into(),
            },
            PhotoCandidate {
                id: "ph_c".into(),
                url: "https://img/c".into(),
                photographer: "C".into(),
            },
        ]));

        let summary = enrich_images(store.clone(), photos, &options()).await.unwrap();
        assert_eq!(summary.assigned, 1);
        assert_eq!(store.rows()[1].fields["unsplash_photo_id"], "ph_c");
    }
}
