use crate::config::{IngestConfig, RendererConfig};
use crate::constants::BROWSER_USER_AGENT;
use crate::error::{Result, ScraperError};
use crate::types::RawItem;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared HTTP fetcher. Every request carries a browser-like User-Agent;
/// several upstream sites serve degraded content to default client
/// identifiers.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new(config: &IngestConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Fetches one page as text. Non-2xx status is a fetch failure; no
    /// retries happen at this layer.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch {
                message: format!("{} returned status {}", url, status.as_u16()),
            });
        }
        Ok(response.text().await?)
    }

    /// Fetches one URL as JSON.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let body = self.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Pagination loop for listing-page sources. Requests pages until a
    /// page yields zero items, the source-declared page count is reached,
    /// or the safety cap is hit, whichever comes first. A page-level fetch
    /// failure stops pagination for the source (zero items from that page).
    pub async fn fetch_paginated<U, P>(
        &self,
        url_for_page: U,
        page_cap: usize,
        parse_page: P,
    ) -> Result<Vec<RawItem>>
    where
        U: Fn(usize) -> String,
        P: FnMut(&str) -> (Vec<RawItem>, Option<usize>),
    {
        paginate(
            url_for_page,
            |url| async move { self.get_text(&url).await },
            page_cap,
            parse_page,
        )
        .await
    }
}

/// The pagination loop itself, with the page fetch injected so the stop
/// conditions run against canned pages in tests.
pub async fn paginate<U, F, Fut, P>(
    url_for_page: U,
    fetch: F,
    page_cap: usize,
    mut parse_page: P,
) -> Result<Vec<RawItem>>
where
    U: Fn(usize) -> String,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String>>,
    P: FnMut(&str) -> (Vec<RawItem>, Option<usize>),
{
    let mut all_items = Vec::new();
    let mut declared_pages: Option<usize> = None;

    for page in 1..=page_cap {
        if let Some(count) = declared_pages {
            if page > count {
                break;
            }
        }

        let body = match fetch(url_for_page(page)).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Stopping pagination at page {}: {}", page, e);
                break;
            }
        };

        let (items, page_count) = parse_page(&body);
        if let Some(count) = page_count {
            declared_pages = Some(count);
        }
        debug!("Page {} yielded {} items", page, items.len());
        if items.is_empty() {
            break;
        }
        all_items.extend(items);
    }

    Ok(all_items)
}

/// Rendering capability for sources whose content is built client-side.
/// The extraction logic only sees the returned DOM snapshot, so it stays
/// testable against static HTML fixtures.
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

/// Plain-HTTP renderer used by default. Embedders running against the
/// client-side source in production inject a headless-browser
/// implementation of `PageRenderer`; this one still honors the navigation
/// timeout and settle delay so the call pattern matches.
pub struct HttpRenderer {
    client: reqwest::Client,
    settle: Duration,
}

impl HttpRenderer {
    pub fn new(config: &RendererConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            settle: Duration::from_millis(config.settle_ms),
        }
    }
}

#[async_trait::async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::Fetch {
                message: format!("{} returned status {}", url, status.as_u16()),
            });
        }
        let body = response.text().await?;
        tokio::time::sleep(self.settle).await;
        Ok(body)
    }
}
