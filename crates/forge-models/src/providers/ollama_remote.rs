//! Models published in the Ollama library, served from a local index

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use forge_client::ForgeConfig;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    error::ModelError,
    extract::{MetadataExtractor, NameHeuristicExtractor},
    library::{
        search::parse_context_length, LibraryFilters, LibraryIndex, LibraryModel,
        LibraryScraper, LibrarySearcher,
    },
    model::{ModelInfo, ModelSize, ModelSource},
    provider::{ListRequest, ModelProvider},
    Result,
};

pub struct OllamaRemoteModelProvider {
    index_path: PathBuf,
    scraper: LibraryScraper,
    extractor: Box<dyn MetadataExtractor>,
    /// `None` until the index is first read
    models: RwLock<Option<Arc<Vec<LibraryModel>>>>,
}

impl OllamaRemoteModelProvider {
    pub fn new(index_path: impl Into<PathBuf>, scraper: LibraryScraper) -> Self {
        Self {
            index_path: index_path.into(),
            scraper,
            extractor: Box::new(NameHeuristicExtractor),
            models: RwLock::new(None),
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        Ok(Self::new(
            config.remote_index_path(),
            LibraryScraper::from_config(config)?,
        ))
    }

    pub fn with_extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    async fn library(&self) -> Arc<Vec<LibraryModel>> {
        if let Some(models) = self.models.read().await.as_ref() {
            return Arc::clone(models);
        }

        let mut slot = self.models.write().await;
        if let Some(models) = slot.as_ref() {
            return Arc::clone(models);
        }
        let models = match LibraryIndex::load(&self.index_path) {
            Ok(models) => {
                info!("Loaded {} library models from index", models.len());
                models
            }
            Err(e) => {
                warn!("Ollama library index unavailable: {}", e);
                Vec::new()
            }
        };
        let models = Arc::new(models);
        *slot = Some(Arc::clone(&models));
        models
    }

    fn to_model_info(&self, entry: &LibraryModel) -> ModelInfo {
        let meta = &entry.metadata;
        let extracted = self.extractor.extract(&entry.name);

        let mut model = ModelInfo::new(entry.name.clone(), ModelSource::OllamaRemote)
            .with_description(entry.description.clone())
            .with_tags(entry.tags.iter().cloned());
        model.url = Some(entry.url.clone());
        model.parameters = meta.parameters.clone().or(extracted.parameters);
        model.size = model
            .parameters
            .as_deref()
            .or(meta.size.as_deref())
            .and_then(ModelSize::parse);
        model.context_length = meta
            .context_length
            .as_deref()
            .and_then(parse_context_length)
            .or(extracted.context_length);
        model.quantization = meta.quantization.clone().or(extracted.quantization);

        let fields = [
            ("license", &meta.license),
            ("author", &meta.author),
            ("last_updated", &meta.last_updated),
            ("download_count", &meta.download_count),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                model.metadata.insert(key.to_string(), json!(value));
            }
        }
        if !meta.capabilities.is_empty() {
            model
                .metadata
                .insert("capabilities".to_string(), json!(meta.capabilities));
        }
        if !meta.languages.is_empty() {
            model
                .metadata
                .insert("languages".to_string(), json!(meta.languages));
        }

        model
    }
}

#[async_trait]
impl ModelProvider for OllamaRemoteModelProvider {
    fn source(&self) -> ModelSource {
        ModelSource::OllamaRemote
    }

    async fn list_models(&self, request: &ListRequest) -> Result<Vec<ModelInfo>> {
        if request.installed_only {
            return Ok(Vec::new());
        }

        let library = self.library().await;
        let filters = LibraryFilters::from_map(&request.filters)?;
        let models: Vec<ModelInfo> = LibrarySearcher::new(&library)
            .search("", &filters)
            .into_iter()
            .map(|(entry, _)| self.to_model_info(entry))
            .collect();
        Ok(request.apply(models))
    }

    async fn get_model(&self, name: &str) -> Option<ModelInfo> {
        let library = self.library().await;
        library
            .iter()
            .find(|m| m.name == name)
            .map(|m| self.to_model_info(m))
    }

    fn supports_index_update(&self) -> bool {
        true
    }

    async fn update_index(&self) -> Result<usize> {
        info!("Rebuilding Ollama library index");
        let models = self.scraper.scrape().await?;
        if models.is_empty() {
            return Err(ModelError::Library(
                "No models found on the library pages".to_string(),
            ));
        }
        LibraryIndex::save(&models, &self.index_path)?;

        let count = models.len();
        *self.models.write().await = Some(Arc::new(models));
        info!("Indexed {} Ollama library models", count);
        Ok(count)
    }
}
