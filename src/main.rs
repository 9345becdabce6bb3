use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

mod config;
mod constants;
mod enrich;
mod error;
mod feeds;
mod fetch;
mod heuristics;
mod listing;
mod logging;
mod normalize;
mod pipeline;
mod reconciler;
mod server;
mod sources;
mod storage;
mod types;

use crate::config::Config;
use crate::enrich::{enrich_images, PhotoSearch, UnsplashClient};
use crate::pipeline::{Pipeline, RunOptions};
use crate::server::AppState;
use crate::sources::create_source;
use crate::storage::{InMemoryStore, ListingStore, SupabaseStore};

#[derive(Parser)]
#[command(name = "faf_scraper")]
#[command(about = "Family Activity Finder listings scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingestion pipeline over one or more sources
    Ingest {
        /// Specific sources to run (comma-separated). Default: all
        #[arg(long)]
        sources: Option<String>,
        /// Preview without writing to storage
        #[arg(long)]
        dry_run: bool,
        /// Cap on the number of items processed per source
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Backfill images for listings missing one
    Enrich {
        /// Preview without writing to storage
        #[arg(long)]
        dry_run: bool,
        /// Cap on the number of listings processed
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Serve the ingest/enrich trigger routes
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: SocketAddr,
    },
}

/// Writes go to Supabase when credentials are present; otherwise an
/// in-memory store backs dry development runs.
fn open_store() -> Arc<dyn ListingStore> {
    match SupabaseStore::from_env() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("No Supabase credentials ({}); using in-memory store", e);
            println!("⚠️  No Supabase credentials; writes stay in memory");
            Arc::new(InMemoryStore::new())
        }
    }
}

async fn run_sources(
    source_names: &[String],
    config: &Config,
    store: Arc<dyn ListingStore>,
    options: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    for name in source_names {
        let Some(adapter) = create_source(name, config) else {
            warn!("Unknown source: {}", name);
            println!("⚠️  Unknown source: {}", name);
            continue;
        };

        match Pipeline::run_for_source(adapter.as_ref(), store.clone(), options).await {
            Ok(summary) => {
                println!("\n📊 Run results for {}:", name);
                println!("   Total items: {}", summary.total_items);
                println!("   Created: {}", summary.created);
                println!("   Updated: {}", summary.updated);
                println!("   Skipped: {}", summary.skipped);
                println!("   Errors: {}", summary.errors.len());

                if !summary.errors.is_empty() {
                    println!("\n⚠️  Errors encountered:");
                    for error in &summary.errors {
                        println!("   - {}", error);
                    }
                }
            }
            Err(e) => {
                error!("Run failed for {}: {}", name, e);
                println!("❌ Run failed for {}: {}", name, e);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Ingest {
            sources,
            dry_run,
            limit,
        } => {
            println!("🔄 Running ingestion pipeline...");

            let source_names: Vec<String> = match sources {
                Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
                None => constants::get_supported_sources()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            };

            let options = RunOptions {
                dry_run,
                limit,
                delay: Duration::from_millis(config.ingest.delay_ms),
            };
            let store = open_store();
            run_sources(&source_names, &config, store, &options).await?;
        }
        Commands::Enrich { dry_run, limit } => {
            println!("🖼️  Running image enrichment...");

            let options = RunOptions {
                dry_run,
                limit,
                delay: Duration::from_millis(config.ingest.delay_ms),
            };
            let store = open_store();
            let photos: Arc<dyn PhotoSearch> = Arc::new(UnsplashClient::from_env()?);

            let summary = enrich_images(store, photos, &options).await?;
            println!("\n📊 Enrichment results:");
            println!("   Listings examined: {}", summary.total);
            println!("   Images assigned: {}", summary.assigned);
            println!("   Skipped: {}", summary.skipped);
            println!("   Errors: {}", summary.errors.len());
        }
        Commands::Serve { addr } => {
            println!("🚀 Starting trigger server...");
            let state = AppState {
                store: open_store(),
                config,
            };
            server::run_server(addr, state).await?;
        }
    }
    Ok(())
}
