//! Models hosted on the Hugging Face hub
//!
//! Listings come from the public `/api/models` endpoint restricted to the
//! `text-generation` pipeline. When an [`OllamaClient`] is attached, GGUF
//! repositories can be pulled into Ollama as `hf.co/<repo>`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forge_client::{ForgeConfig, OllamaClient};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::{
    error::ModelError,
    extract::{MetadataExtractor, NameHeuristicExtractor},
    model::{ModelInfo, ModelSize, ModelSource},
    progress::DownloadProgress,
    provider::{ListRequest, ModelInstaller, ModelProvider},
    Result,
};

use super::pull_with_progress;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 100;
const PIPELINE_TAG: &str = "text-generation";
const HUB_URL: &str = "https://huggingface.co";
const OLLAMA_PREFIXES: [&str; 2] = ["hf.co/", "huggingface.co/"];

/// Query keys forwarded verbatim to the hub
const FORWARDED_FILTERS: [&str; 3] = ["filter", "sort", "author"];

#[derive(Debug, Deserialize)]
struct HubModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "modelId")]
    model_id: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    downloads: Option<u64>,
    #[serde(default)]
    likes: Option<u64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default, rename = "createdAt")]
    created_at: Option<String>,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<String>,
    #[serde(default)]
    private: Option<bool>,
    #[serde(default)]
    description: Option<String>,
}

/// Ordering for [`HuggingFaceModelProvider::sort_models`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Most downloaded first
    Downloads,
    /// Most liked first
    Likes,
    Name,
}

pub struct HuggingFaceModelProvider {
    client: Arc<Client>,
    api_url: String,
    ollama: Option<OllamaClient>,
    extractor: Box<dyn MetadataExtractor>,
    cache: RwLock<HashMap<String, ModelInfo>>,
}

impl HuggingFaceModelProvider {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ModelError::HuggingFaceApi(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            ollama: None,
            extractor: Box::new(NameHeuristicExtractor),
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        Self::new(config.huggingface_api_url.clone(), config.timeout())
    }

    /// Attach an Ollama client so hub models can be installed
    pub fn with_ollama(mut self, client: OllamaClient) -> Self {
        self.ollama = Some(client);
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Search the hub for text-generation models
    ///
    /// # Errors
    /// `Validation` when `limit` is outside 1..=100, `HuggingFaceApi` on
    /// transport or HTTP failure.
    pub async fn fetch_models(
        &self,
        search: Option<&str>,
        limit: usize,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<ModelInfo>> {
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ModelError::Validation(format!(
                "Limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }

        let mut query: Vec<(&str, String)> = vec![
            ("limit", limit.to_string()),
            ("pipeline_tag", PIPELINE_TAG.to_string()),
        ];
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        for key in FORWARDED_FILTERS {
            if let Some(value) = filters.get(key) {
                query.push((key, value.clone()));
            }
        }

        let url = format!("{}/api/models", self.api_url);
        debug!("Querying Hugging Face: {} {:?}", url, query);
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ModelError::HuggingFaceApi(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::HuggingFaceApi(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let hub_models: Vec<HubModel> = response
            .json()
            .await
            .map_err(|e| ModelError::HuggingFaceApi(format!("Invalid response: {}", e)))?;

        let models: Vec<ModelInfo> = hub_models
            .into_iter()
            .filter_map(|m| self.to_model_info(m))
            .collect();

        let mut cache = self.cache.write().await;
        for model in &models {
            cache.insert(model.name.clone(), model.clone());
        }
        Ok(models)
    }

    fn to_model_info(&self, hub: HubModel) -> Option<ModelInfo> {
        let id = hub.id.or(hub.model_id).filter(|id| !id.is_empty())?;
        let extracted = self.extractor.extract(&id);

        let mut model = ModelInfo::new(id.clone(), ModelSource::HuggingFace);
        model.description = hub
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "No description available".to_string());
        model.tags = hub.pipeline_tag.into_iter().chain(hub.tags).collect();
        model.url = Some(format!("{}/{}", HUB_URL, id));
        model.size = extracted.parameters.as_deref().and_then(ModelSize::parse);
        model.parameters = extracted.parameters;
        model.quantization = extracted.quantization;
        model.context_length = extracted.context_length;

        let author = hub
            .author
            .or_else(|| id.split_once('/').map(|(owner, _)| owner.to_string()));
        if let Some(author) = author {
            model.metadata.insert("author".to_string(), json!(author));
        }
        model
            .metadata
            .insert("downloads".to_string(), json!(hub.downloads.unwrap_or(0)));
        model
            .metadata
            .insert("likes".to_string(), json!(hub.likes.unwrap_or(0)));
        if let Some(created_at) = hub.created_at {
            model.metadata.insert("created_at".to_string(), json!(created_at));
        }
        if let Some(last_modified) = hub.last_modified {
            model
                .metadata
                .insert("last_modified".to_string(), json!(last_modified));
        }
        model
            .metadata
            .insert("private".to_string(), json!(hub.private.unwrap_or(false)));

        Some(model)
    }

    /// Hub models already pulled into Ollama
    async fn installed_models(&self) -> Result<Vec<ModelInfo>> {
        let Some(ollama) = &self.ollama else {
            return Ok(Vec::new());
        };

        let tags = ollama.list_models().await?;
        let models = tags
            .models
            .iter()
            .filter_map(|tag| {
                let repo = OLLAMA_PREFIXES
                    .iter()
                    .find_map(|prefix| tag.name.strip_prefix(prefix))?;
                let repo = repo.split(':').next().unwrap_or(repo);
                let mut model = ModelInfo::new(repo, ModelSource::HuggingFace)
                    .with_description(format!("Installed from Hugging Face as {}", tag.name));
                model.url = Some(format!("{}/{}", HUB_URL, repo));
                model.installed = true;
                model
                    .metadata
                    .insert("ollama_name".to_string(), json!(tag.name));
                Some(model)
            })
            .collect();
        Ok(models)
    }

    /// Keep models with at least `min_downloads` and every tag in `required_tags`
    pub fn filter_models(
        models: Vec<ModelInfo>,
        min_downloads: Option<u64>,
        required_tags: &[String],
    ) -> Vec<ModelInfo> {
        models
            .into_iter()
            .filter(|m| {
                min_downloads.map_or(true, |min| m.metadata_u64("downloads").unwrap_or(0) >= min)
            })
            .filter(|m| required_tags.iter().all(|t| m.tags.contains(t)))
            .collect()
    }

    pub fn sort_models(models: &mut [ModelInfo], by: SortKey) {
        match by {
            SortKey::Downloads => models.sort_by_key(|m| {
                std::cmp::Reverse(m.metadata_u64("downloads").unwrap_or(0))
            }),
            SortKey::Likes => {
                models.sort_by_key(|m| std::cmp::Reverse(m.metadata_u64("likes").unwrap_or(0)))
            }
            SortKey::Name => models.sort_by(|a, b| a.name.cmp(&b.name)),
        }
    }
}

#[async_trait]
impl ModelProvider for HuggingFaceModelProvider {
    fn source(&self) -> ModelSource {
        ModelSource::HuggingFace
    }

    async fn list_models(&self, request: &ListRequest) -> Result<Vec<ModelInfo>> {
        if request.installed_only {
            let models = self.installed_models().await?;
            return Ok(request.apply(models));
        }

        let limit = request
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);
        self.fetch_models(request.query_text(), limit, &request.filters)
            .await
    }

    async fn get_model(&self, name: &str) -> Option<ModelInfo> {
        if let Some(model) = self.cache.read().await.get(name) {
            return Some(model.clone());
        }

        let url = format!("{}/api/models/{}", self.api_url, name);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Hugging Face lookup of {} failed: {}", name, e);
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            debug!(
                "Hugging Face model {} not available (HTTP {})",
                name,
                response.status().as_u16()
            );
            return None;
        }

        let hub: HubModel = match response.json().await {
            Ok(hub) => hub,
            Err(e) => {
                warn!("Invalid Hugging Face response for {}: {}", name, e);
                return None;
            }
        };
        let model = self.to_model_info(hub)?;
        self.cache
            .write()
            .await
            .insert(model.name.clone(), model.clone());
        Some(model)
    }
}

#[async_trait]
impl ModelInstaller for HuggingFaceModelProvider {
    async fn install_model(
        &self,
        model: &ModelInfo,
        progress: Option<&dyn DownloadProgress>,
    ) -> bool {
        let Some(ollama) = &self.ollama else {
            error!(
                "Cannot install {}: Hugging Face models are installed through Ollama",
                model.name
            );
            return false;
        };
        let ollama_name = format!("hf.co/{}", model.name);
        pull_with_progress(ollama, &ollama_name, progress).await
    }

    async fn uninstall_model(&self, name: &str) -> bool {
        let Some(ollama) = &self.ollama else {
            error!("Cannot uninstall {}: no Ollama client configured", name);
            return false;
        };

        let mut targets: Vec<String> = match ollama.list_models().await {
            Ok(tags) => tags
                .models
                .into_iter()
                .map(|t| t.name)
                .filter(|tag| {
                    OLLAMA_PREFIXES.iter().any(|prefix| {
                        tag.strip_prefix(prefix).is_some_and(|rest| {
                            rest == name || rest.strip_prefix(name).is_some_and(|r| r.starts_with(':'))
                        })
                    })
                })
                .collect(),
            Err(e) => {
                warn!("Failed to list Ollama models before uninstalling {}: {}", name, e);
                Vec::new()
            }
        };
        if targets.is_empty() {
            targets.push(format!("hf.co/{}", name));
        }

        let mut removed = true;
        for target in &targets {
            if let Err(e) = ollama.delete(target).await {
                error!("Failed to uninstall {}: {}", target, e);
                removed = false;
            }
        }
        removed
    }
}
