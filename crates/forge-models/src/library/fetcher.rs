//! Page retrieval for the library scraper

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{error::ModelError, Result};

const USER_AGENT: &str = concat!("ollama-forge/", env!("CARGO_PKG_VERSION"));

/// Fetches a page body by URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetcher with fixed-delay retries
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, retries: u32, retry_delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ModelError::Library(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retries,
            retry_delay,
        })
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<String, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let attempts = self.retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!("Fetching {} (attempt {}/{})", url, attempt, attempts);
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!("Fetch of {} failed on attempt {}: {}", url, attempt, e);
                    last_error = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(ModelError::Library(format!(
            "Failed to fetch {} after {} attempts: {}",
            url, attempts, last_error
        )))
    }
}
