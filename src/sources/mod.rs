//! One adapter per external site/feed. Each implements `SourceAdapter`
//! with its own fetch and extraction heuristics over the shared helpers.

pub mod badm;
pub mod chabot;
pub mod community_rss;
pub mod eventbrite;
pub mod library;
pub mod parks;

use crate::config::Config;
use crate::constants;
use crate::fetch::{Fetcher, HttpRenderer, PageRenderer};
use crate::types::SourceAdapter;
use std::sync::Arc;

/// Builds the adapter for a source name, or `None` for an unknown source.
pub fn create_source(name: &str, config: &Config) -> Option<Box<dyn SourceAdapter>> {
    let fetcher = Fetcher::new(&config.ingest);
    match name {
        constants::BADM_SOURCE => Some(Box::new(badm::BadmCrawler::new(fetcher))),
        constants::CHABOT_SOURCE => {
            let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new(&config.renderer));
            Some(Box::new(chabot::ChabotCrawler::new(renderer)))
        }
        constants::PARKS_SOURCE => Some(Box::new(parks::ParksCrawler::new(
            fetcher,
            config.ingest.page_cap,
        ))),
        constants::LIBRARY_SOURCE => Some(Box::new(library::LibraryCrawler::new(fetcher))),
        constants::COMMUNITY_RSS_SOURCE => {
            Some(Box::new(community_rss::CommunityRssCrawler::new(fetcher)))
        }
        constants::EVENTBRITE_SOURCE => Some(Box::new(eventbrite::EventbriteCrawler::new(
            fetcher,
            config.ingest.page_cap,
        ))),
        _ => None,
    }
}
