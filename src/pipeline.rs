use crate::error::Result;
use crate::normalize::normalize;
use crate::reconciler::Reconciler;
use crate::storage::ListingStore;
use crate::types::{ChangeType, SourceAdapter};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Per-run tunables handed in by the caller (CLI flags or trigger route).
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Preview without writing; create/update counts reflect what a real
    /// run would have done.
    pub dry_run: bool,
    /// Cap on the number of items processed.
    pub limit: Option<usize>,
    /// Unconditional delay between consecutive network-bearing items.
    pub delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            limit: None,
            delay: Duration::from_millis(1500),
        }
    }
}

/// Result of one full ingestion pass over one source's item list.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub source_name: String,
    pub total_items: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

pub struct Pipeline;

impl Pipeline {
    /// Runs one full ingestion pass: fetch the item list, then per item
    /// extract, normalize, and reconcile, with the skip policy applied in
    /// order (missing natural key, missing title, past start date). Item
    /// failures are counted and never abort the run; only a failure to
    /// acquire the initial item list propagates.
    #[instrument(skip(adapter, store, options), fields(source = %adapter.source_name()))]
    pub async fn run_for_source(
        adapter: &dyn SourceAdapter,
        store: Arc<dyn ListingStore>,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let source_name = adapter.source_name().to_string();
        info!("Starting ingestion run for {}", source_name);
        counter!("faf_ingest_runs_total", "source" => source_name.clone()).increment(1);

        // One timestamp for every past-event comparison in this run, so the
        // skip boundary doesn't drift over a long scrape.
        let run_started_at: DateTime<Utc> = Utc::now();

        let t_fetch = std::time::Instant::now();
        let items = adapter.fetch_items().await?;
        histogram!("faf_fetch_duration_seconds", "source" => source_name.clone())
            .record(t_fetch.elapsed().as_secs_f64());
        info!("Fetched {} items from {}", items.len(), source_name);
        println!("📡 Fetched {} items from {}", items.len(), source_name);

        let reconciler = Reconciler::new(store.clone());
        let config = adapter.static_config().clone();

        let mut created = 0usize;
        let mut updated = 0usize;
        let mut skipped = 0usize;
        let mut errors: Vec<String> = Vec::new();

        let item_count = match options.limit {
            Some(limit) => items.len().min(limit),
            None => items.len(),
        };

        for (i, item) in items.iter().take(item_count).enumerate() {
            if i > 0 {
                tokio::time::sleep(options.delay).await;
            }

            let fields = match adapter.extract_fields(item).await {
                Ok(fields) => fields,
                Err(e) => {
                    error!("Extraction failed for item {}: {}", i, e);
                    errors.push(format!("item {}: extraction failed: {}", i, e));
                    continue;
                }
            };

            // Skip policy, in order
            if fields.natural_key.is_none() {
                debug!("Skipping item {}: no natural key", i);
                skipped += 1;
                continue;
            }
            if fields
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .is_none()
            {
                debug!("Skipping item {}: no title", i);
                skipped += 1;
                continue;
            }
            if let Some(start) = fields.start_date {
                if start.with_timezone(&Utc) < run_started_at {
                    debug!("Skipping item {}: starts in the past ({})", i, start);
                    skipped += 1;
                    continue;
                }
            }

            let listing = match normalize(&fields, &config) {
                Ok(listing) => listing,
                Err(e) => {
                    errors.push(format!("item {}: normalize failed: {}", i, e));
                    continue;
                }
            };

            if options.dry_run {
                match store.find_by_natural_key(&listing.natural_key).await {
                    Ok(Some(_)) => updated += 1,
                    Ok(None) => created += 1,
                    Err(e) => {
                        warn!("Dry-run lookup failed for item {}: {}", i, e);
                        errors.push(format!("item {}: lookup failed: {}", i, e));
                    }
                }
                println!("   [dry run] {} -> {}", listing.title, listing.natural_key.value());
                continue;
            }

            match reconciler.reconcile(&listing).await {
                Ok(ChangeType::Created) => created += 1,
                Ok(ChangeType::Updated) => updated += 1,
                Err(e) => {
                    error!("Write failed for {}: {}", listing.title, e);
                    errors.push(format!("item {}: write failed: {}", i, e));
                }
            }
        }

        counter!("faf_listings_created_total", "source" => source_name.clone())
            .increment(created as u64);
        counter!("faf_listings_updated_total", "source" => source_name.clone())
            .increment(updated as u64);
        counter!("faf_items_skipped_total", "source" => source_name.clone())
            .increment(skipped as u64);
        counter!("faf_item_errors_total", "source" => source_name.clone())
            .increment(errors.len() as u64);

        info!(
            "Run finished for {}: {} created, {} updated, {} skipped, {} errors",
            source_name,
            created,
            updated,
            skipped,
            errors.len()
        );

        Ok(RunSummary {
            source_name,
            total_items: items.len(),
            created,
            updated,
            skipped,
            errors,
        })
    }
}
