//! Coordinator across model sources
//!
//! [`ModelManager`] owns one provider (and optionally one installer) per
//! [`ModelSource`], fans searches out across them, and keeps an installed-model
//! cache keyed by `(name, source)` so the same name in two sources never
//! collides.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use forge_client::{ForgeConfig, OllamaClient};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    model::{ModelInfo, ModelKey, ModelSource},
    progress::DownloadProgress,
    provider::{ListRequest, ModelInstaller, ModelProvider},
    providers::{HuggingFaceModelProvider, OllamaLocalModelProvider, OllamaRemoteModelProvider},
    scoring::{query_terms, relevance_score},
    Result,
};

/// Outcome of rebuilding one source's index
#[derive(Debug)]
pub struct IndexUpdate {
    pub source: ModelSource,
    /// Number of models indexed
    pub result: Result<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ManagerState {
    installed_models: Vec<ModelInfo>,
}

#[derive(Default)]
pub struct ModelManager {
    providers: BTreeMap<ModelSource, Arc<dyn ModelProvider>>,
    installers: BTreeMap<ModelSource, Arc<dyn ModelInstaller>>,
    installed: HashMap<ModelKey, ModelInfo>,
}

impl ModelManager {
    /// A manager with no sources registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Register all three sources from configuration
    ///
    /// Local Ollama and Hugging Face are also registered as installers; the
    /// Hugging Face installer pulls through the same Ollama client.
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        let client = OllamaClient::from_config(config)?;

        let local = Arc::new(OllamaLocalModelProvider::new(client.clone()));
        let remote = Arc::new(OllamaRemoteModelProvider::from_config(config)?);
        let huggingface = Arc::new(HuggingFaceModelProvider::from_config(config)?.with_ollama(client));

        let mut manager = Self::new();
        manager.register_provider(local.clone());
        manager.register_installer(ModelSource::OllamaLocal, local);
        manager.register_provider(remote);
        manager.register_provider(huggingface.clone());
        manager.register_installer(ModelSource::HuggingFace, huggingface);
        Ok(manager)
    }

    /// Register a provider under its own source, replacing any previous one
    pub fn register_provider(&mut self, provider: Arc<dyn ModelProvider>) {
        let source = provider.source();
        debug!("Registering provider for {}", source);
        self.providers.insert(source, provider);
    }

    pub fn register_installer(&mut self, source: ModelSource, installer: Arc<dyn ModelInstaller>) {
        debug!("Registering installer for {}", source);
        self.installers.insert(source, installer);
    }

    pub fn sources(&self) -> Vec<ModelSource> {
        self.providers.keys().copied().collect()
    }

    pub fn provider(&self, source: ModelSource) -> Option<&Arc<dyn ModelProvider>> {
        self.providers.get(&source)
    }

    fn is_installed(&self, model: &ModelInfo) -> bool {
        if self.installed.contains_key(&model.key()) {
            return true;
        }
        if model.source == ModelSource::OllamaRemote {
            let latest = format!("{}:latest", model.name);
            return [model.name.as_str(), latest.as_str()].into_iter().any(|name| {
                self.installed
                    .contains_key(&ModelKey::new(name, ModelSource::OllamaLocal))
            });
        }
        false
    }

    /// Search the selected sources (all when `None`) and rank the results
    ///
    /// A source that fails is logged and skipped. A blank query returns
    /// every listed model in source order.
    pub async fn search_models(
        &mut self,
        query: &str,
        sources: Option<&[ModelSource]>,
        limit: Option<usize>,
    ) -> Vec<ModelInfo> {
        self.refresh_installed_models().await;

        let request = ListRequest {
            query: Some(query.to_string()),
            ..ListRequest::default()
        };

        let mut results: Vec<ModelInfo> = Vec::new();
        for (source, provider) in &self.providers {
            if sources.is_some_and(|wanted| !wanted.contains(source)) {
                continue;
            }
            match provider.list_models(&request).await {
                Ok(models) => {
                    debug!("{} returned {} models for '{}'", source, models.len(), query);
                    results.extend(models);
                }
                Err(e) => warn!("Skipping {} in search: {}", source, e),
            }
        }

        for model in &mut results {
            model.installed = self.is_installed(model);
        }

        let terms = query_terms(query);
        let mut ranked: Vec<ModelInfo> = if terms.is_empty() {
            results
        } else {
            let mut scored: Vec<(u32, ModelInfo)> = results
                .into_iter()
                .map(|m| (relevance_score(&m, &terms), m))
                .filter(|(score, _)| *score > 0)
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            scored.into_iter().map(|(_, m)| m).collect()
        };

        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        info!("Search for '{}' returned {} models", query, ranked.len());
        ranked
    }

    /// Look up one model in one source
    pub async fn get_model_details(&self, name: &str, source: ModelSource) -> Option<ModelInfo> {
        let provider = self.providers.get(&source)?;
        let mut model = provider.get_model(name).await?;
        model.installed = model.installed || self.is_installed(&model);
        Some(model)
    }

    /// Install `name` from `source`
    ///
    /// Returns false when the source has no installer or the install fails.
    pub async fn install_model(
        &mut self,
        name: &str,
        source: ModelSource,
        progress: Option<&dyn DownloadProgress>,
    ) -> bool {
        let Some(installer) = self.installers.get(&source).cloned() else {
            error!("Models from {} cannot be installed directly", source);
            return false;
        };

        let model = match self.providers.get(&source) {
            Some(provider) => provider.get_model(name).await,
            None => None,
        }
        .unwrap_or_else(|| ModelInfo::new(name, source));

        info!("Installing {} from {}", name, source);
        if !installer.install_model(&model, progress).await {
            error!("Installation of {} from {} failed", name, source);
            return false;
        }

        self.refresh_installed_models().await;
        // Ollama records an untagged pull as `name:latest`
        let latest = format!("{}:latest", name);
        let reported = [name, latest.as_str()]
            .into_iter()
            .any(|n| self.installed.contains_key(&ModelKey::new(n, source)));
        if !reported {
            self.installed.insert(
                model.key(),
                ModelInfo {
                    installed: true,
                    ..model
                },
            );
        }
        true
    }

    /// Remove an installed model
    ///
    /// Without a source, the first source (in source order) holding the name
    /// is used.
    pub async fn uninstall_model(&mut self, name: &str, source: Option<ModelSource>) -> bool {
        if self.installed_source(name, source).is_none() {
            self.refresh_installed_models().await;
        }
        let Some(source) = self.installed_source(name, source) else {
            warn!("Model {} is not installed", name);
            return false;
        };

        let Some(installer) = self.installers.get(&source).cloned() else {
            error!("Models from {} cannot be uninstalled", source);
            return false;
        };

        if !installer.uninstall_model(name).await {
            error!("Uninstalling {} from {} failed", name, source);
            return false;
        }
        self.installed.remove(&ModelKey::new(name, source));
        info!("Uninstalled {} from {}", name, source);
        true
    }

    fn installed_source(&self, name: &str, source: Option<ModelSource>) -> Option<ModelSource> {
        let candidates: Vec<ModelSource> = match source {
            Some(source) => vec![source],
            None => ModelSource::ALL.to_vec(),
        };
        candidates
            .into_iter()
            .find(|s| self.installed.contains_key(&ModelKey::new(name, *s)))
    }

    /// Installed models sorted by name, then source
    pub async fn list_installed_models(&mut self) -> Vec<ModelInfo> {
        self.refresh_installed_models().await;
        self.installed_snapshot()
    }

    fn installed_snapshot(&self) -> Vec<ModelInfo> {
        let mut models: Vec<ModelInfo> = self.installed.values().cloned().collect();
        models.sort_by(|a, b| a.key().cmp(&b.key()));
        models
    }

    /// Rebuild the installed cache from every provider
    pub async fn refresh_installed_models(&mut self) {
        let request = ListRequest::installed();
        let mut installed = HashMap::new();

        for (source, provider) in &self.providers {
            match provider.list_models(&request).await {
                Ok(models) => {
                    for mut model in models {
                        model.installed = true;
                        installed.insert(model.key(), model);
                    }
                }
                Err(e) => warn!("Could not list installed models from {}: {}", source, e),
            }
        }

        debug!("{} installed models across all sources", installed.len());
        self.installed = installed;
    }

    /// Rebuild the index of every source that keeps one
    pub async fn update_model_indices(&self) -> Vec<IndexUpdate> {
        let updates = self
            .providers
            .iter()
            .filter(|(_, provider)| provider.supports_index_update())
            .map(|(source, provider)| async move {
                let result = provider.update_index().await;
                match &result {
                    Ok(count) => info!("Updated {} index with {} models", source, count),
                    Err(e) => error!("Failed to update {} index: {}", source, e),
                }
                IndexUpdate {
                    source: *source,
                    result,
                }
            });
        join_all(updates).await
    }

    /// Write the installed cache as `{"installed_models": [...]}`
    pub fn save_state(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let state = ManagerState {
            installed_models: self.installed_snapshot(),
        };
        fs::write(path, serde_json::to_string_pretty(&state)?)?;
        info!(
            "Saved {} installed models to {}",
            state.installed_models.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the installed cache from a snapshot
    ///
    /// Returns `Ok(false)` when no snapshot exists at `path`.
    pub fn load_state(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            debug!("No model state at {}", path.display());
            return Ok(false);
        }

        let content = fs::read_to_string(path)?;
        let state: ManagerState = serde_json::from_str(&content)?;
        self.installed = state
            .installed_models
            .into_iter()
            .map(|mut model| {
                model.installed = true;
                (model.key(), model)
            })
            .collect();
        info!(
            "Loaded {} installed models from {}",
            self.installed.len(),
            path.display()
        );
        Ok(true)
    }

    /// Installed models as currently cached, without refreshing
    pub fn installed_models(&self) -> Vec<ModelInfo> {
        self.installed_snapshot()
    }
}
