//! Crawler that turns library pages into [`LibraryModel`] entries

use std::collections::HashSet;
use std::sync::Arc;

use forge_client::ForgeConfig;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{
    fetcher::{HttpPageFetcher, PageFetcher},
    parser::{LibraryPageParser, MarkupLibraryParser},
    LibraryModel,
};
use crate::Result;

/// Upper bound on listing pages visited per crawl
const DEFAULT_MAX_PAGES: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    /// Root listing page
    pub base_url: String,
    /// Detail pages fetched at once
    pub concurrency: usize,
    pub fetch_detailed_info: bool,
    pub max_pages: usize,
}

impl ScraperConfig {
    pub fn from_forge_config(config: &ForgeConfig) -> Self {
        Self {
            base_url: config.library_url.clone(),
            concurrency: config.scraper_concurrency,
            fetch_detailed_info: config.fetch_detailed_info,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

pub struct LibraryScraper {
    config: ScraperConfig,
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn LibraryPageParser>,
}

impl LibraryScraper {
    pub fn new(
        config: ScraperConfig,
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn LibraryPageParser>,
    ) -> Self {
        Self {
            config,
            fetcher,
            parser,
        }
    }

    /// HTTP fetcher and markup parser configured from `config`
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        let fetcher = HttpPageFetcher::new(
            config.timeout(),
            config.scraper_retries,
            config.scraper_retry_delay(),
        )?;
        Ok(Self::new(
            ScraperConfig::from_forge_config(config),
            Arc::new(fetcher),
            Arc::new(MarkupLibraryParser),
        ))
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Crawl the library depth-first from the root page
    ///
    /// Each page is fetched at most once. Models keep the order in which
    /// they were first seen. Only a failure on the root page aborts the crawl.
    pub async fn scrape(&self) -> Result<Vec<LibraryModel>> {
        let root = self.config.base_url.clone();
        let mut stack = vec![root.clone()];
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        let mut models = Vec::new();

        while let Some(url) = stack.pop() {
            if visited.contains(&url) {
                continue;
            }
            if visited.len() >= self.config.max_pages {
                warn!(
                    "Stopping library crawl after {} pages",
                    self.config.max_pages
                );
                break;
            }
            visited.insert(url.clone());

            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(e) if url == root => return Err(e),
                Err(e) => {
                    warn!("Skipping library page {}: {}", url, e);
                    continue;
                }
            };

            let page = self.parser.parse_listing(&html, &url);
            debug!(
                "Parsed {} models and {} links from {}",
                page.models.len(),
                page.next_pages.len(),
                url
            );
            for model in page.models {
                if seen_names.insert(model.name.clone()) {
                    models.push(model);
                }
            }
            for next in page.next_pages.into_iter().rev() {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
        }

        info!(
            "Scraped {} models from {} library pages",
            models.len(),
            visited.len()
        );

        if self.config.fetch_detailed_info {
            models = self.fetch_details(models).await;
        }
        Ok(models)
    }

    async fn fetch_details(&self, models: Vec<LibraryModel>) -> Vec<LibraryModel> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let tasks = models.into_iter().map(|mut model| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return model;
                };
                match self.fetcher.fetch(&model.url).await {
                    Ok(html) => self.parser.parse_details(&html, &mut model),
                    Err(e) => warn!("Keeping basic entry for {}: {}", model.name, e),
                }
                model
            }
        });

        join_all(tasks).await
    }
}
