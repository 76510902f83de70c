//! The public Ollama model library
//!
//! The library has no listing API, so its pages are scraped into a local
//! index file that the remote provider searches offline.

pub mod fetcher;
pub mod index;
pub mod parser;
pub mod scraper;
pub mod search;

use serde::{Deserialize, Serialize};

pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use index::LibraryIndex;
pub use parser::{LibraryPageParser, ListingPage, MarkupLibraryParser};
pub use scraper::{LibraryScraper, ScraperConfig};
pub use search::{parameter_billions, LibraryFilters, LibrarySearcher};

/// One entry of the Ollama library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryModel {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: LibraryMetadata,
}

impl LibraryModel {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Fields scraped from a model's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// e.g. `"7B"` or `"1B, 3B"` when several sizes are published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    /// As displayed, e.g. `"12.3M"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_count: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// As displayed, e.g. `"8k"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
}

impl LibraryMetadata {
    /// Every populated field as lower-cased searchable text
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = [
            &self.size,
            &self.parameters,
            &self.license,
            &self.author,
            &self.context_length,
            &self.quantization,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();
        parts.extend(self.capabilities.iter().map(String::as_str));
        parts.extend(self.languages.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }
}
