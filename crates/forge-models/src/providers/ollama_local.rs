//! Models installed in the local Ollama daemon

use async_trait::async_trait;
use forge_client::{ForgeConfig, OllamaClient, TagModel};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    extract::{MetadataExtractor, NameHeuristicExtractor},
    model::{ModelInfo, ModelSize, ModelSource},
    progress::DownloadProgress,
    provider::{ListRequest, ModelInstaller, ModelProvider},
    Result,
};

use super::pull_with_progress;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with base-1024 units (`4_000_000_000` → `"3.7GB"`)
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if size < 10.0 {
        format!("{:.1}{}", size, SIZE_UNITS[unit])
    } else {
        format!("{:.0}{}", size, SIZE_UNITS[unit])
    }
}

pub struct OllamaLocalModelProvider {
    client: OllamaClient,
    extractor: Box<dyn MetadataExtractor>,
}

impl OllamaLocalModelProvider {
    pub fn new(client: OllamaClient) -> Self {
        Self {
            client,
            extractor: Box::new(NameHeuristicExtractor),
        }
    }

    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        Ok(Self::new(OllamaClient::from_config(config)?))
    }

    pub fn with_extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    fn to_model_info(&self, tag: &TagModel) -> ModelInfo {
        let extracted = self.extractor.extract(&tag.name);
        let details = tag.details.clone().unwrap_or_default();

        let mut model = ModelInfo::new(tag.name.clone(), ModelSource::OllamaLocal);
        model.description = details
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("Local Ollama model: {}", tag.name));
        model.parameters = details
            .parameter_size
            .filter(|p| !p.is_empty())
            .or(extracted.parameters);
        model.quantization = details
            .quantization_level
            .filter(|q| !q.is_empty())
            .or(extracted.quantization);
        model.context_length = extracted.context_length;
        model.size = (tag.size > 0)
            .then(|| ModelSize::parse(&format_size(tag.size)))
            .flatten();
        model.installed = true;

        model.tags = extracted.tags;
        if let Some(family) = details.family.as_deref().filter(|f| !f.is_empty()) {
            if !model.tags.iter().any(|t| t == family) {
                model.tags.push(family.to_string());
            }
            model.metadata.insert("family".to_string(), json!(family));
        }

        if !tag.digest.is_empty() {
            model.metadata.insert("digest".to_string(), json!(tag.digest));
        }
        if let Some(modified_at) = tag.modified_at {
            model
                .metadata
                .insert("modified_at".to_string(), json!(modified_at.to_rfc3339()));
        }
        model.metadata.insert("size_bytes".to_string(), json!(tag.size));
        if let Some(format) = details.format.filter(|f| !f.is_empty()) {
            model.metadata.insert("format".to_string(), json!(format));
        }

        model
    }
}

#[async_trait]
impl ModelProvider for OllamaLocalModelProvider {
    fn source(&self) -> ModelSource {
        ModelSource::OllamaLocal
    }

    async fn list_models(&self, request: &ListRequest) -> Result<Vec<ModelInfo>> {
        let tags = self.client.list_models().await?;
        let models: Vec<ModelInfo> = tags.models.iter().map(|t| self.to_model_info(t)).collect();
        debug!("Ollama reports {} installed models", models.len());
        Ok(request.apply(models))
    }

    async fn get_model(&self, name: &str) -> Option<ModelInfo> {
        let tags = match self.client.list_models().await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("Failed to list local models while looking up {}: {}", name, e);
                return None;
            }
        };
        let latest = format!("{}:latest", name);
        tags.models
            .iter()
            .find(|t| t.name == name || t.name == latest)
            .map(|t| self.to_model_info(t))
    }
}

#[async_trait]
impl ModelInstaller for OllamaLocalModelProvider {
    async fn install_model(
        &self,
        model: &ModelInfo,
        progress: Option<&dyn DownloadProgress>,
    ) -> bool {
        info!("Installing {} through Ollama", model.name);
        pull_with_progress(&self.client, &model.name, progress).await
    }

    async fn uninstall_model(&self, name: &str) -> bool {
        match self.client.delete(name).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to uninstall {}: {}", name, e);
                false
            }
        }
    }
}
