//! ModelManager behaviour with in-memory sources

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forge_models::{
    DownloadProgress, ListRequest, ModelError, ModelInfo, ModelInstaller, ModelKey,
    ModelManager, ModelProvider, ModelSource, Result,
};
use tempfile::TempDir;

/// A source backed by a fixed catalogue plus a mutable installed set
struct FakeSource {
    source: ModelSource,
    catalogue: Vec<ModelInfo>,
    installed: Mutex<Vec<ModelInfo>>,
    fail_listing: AtomicBool,
    index_result: Option<std::result::Result<usize, String>>,
    installs: AtomicUsize,
    /// Record untagged installs as `name:latest`, like the Ollama daemon
    tags_latest: bool,
}

impl FakeSource {
    fn new(source: ModelSource) -> Self {
        Self {
            source,
            catalogue: Vec::new(),
            installed: Mutex::new(Vec::new()),
            fail_listing: AtomicBool::new(false),
            index_result: None,
            installs: AtomicUsize::new(0),
            tags_latest: false,
        }
    }

    fn with_model(mut self, name: &str, description: &str, tags: &[&str]) -> Self {
        self.catalogue.push(
            ModelInfo::new(name, self.source)
                .with_description(description)
                .with_tags(tags.iter().copied()),
        );
        self
    }

    fn with_installed(self, name: &str) -> Self {
        let mut model = ModelInfo::new(name, self.source);
        model.installed = true;
        self.installed.lock().unwrap().push(model);
        self
    }

    fn tagging_latest(mut self) -> Self {
        self.tags_latest = true;
        self
    }

    fn with_index_result(mut self, result: std::result::Result<usize, String>) -> Self {
        self.index_result = Some(result);
        self
    }
}

#[async_trait]
impl ModelProvider for FakeSource {
    fn source(&self) -> ModelSource {
        self.source
    }

    async fn list_models(&self, request: &ListRequest) -> Result<Vec<ModelInfo>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ModelError::HuggingFaceApi("service unavailable".into()));
        }
        let models = if request.installed_only {
            self.installed.lock().unwrap().clone()
        } else {
            self.catalogue.clone()
        };
        let query = request.query_text().unwrap_or_default().to_string();
        Ok(models
            .into_iter()
            .filter(|m| m.matches_query(&query))
            .collect())
    }

    async fn get_model(&self, name: &str) -> Option<ModelInfo> {
        self.catalogue.iter().find(|m| m.name == name).cloned()
    }

    fn supports_index_update(&self) -> bool {
        self.index_result.is_some()
    }

    async fn update_index(&self) -> Result<usize> {
        match &self.index_result {
            Some(Ok(count)) => Ok(*count),
            Some(Err(msg)) => Err(ModelError::Library(msg.clone())),
            None => Err(ModelError::UnsupportedSource(self.source)),
        }
    }
}

#[async_trait]
impl ModelInstaller for FakeSource {
    async fn install_model(&self, model: &ModelInfo, progress: Option<&dyn DownloadProgress>) -> bool {
        if model.name == "broken" {
            return false;
        }
        if let Some(progress) = progress {
            progress.update(10, 10);
        }
        self.installs.fetch_add(1, Ordering::SeqCst);
        let mut installed = model.clone();
        installed.installed = true;
        if self.tags_latest && !installed.name.contains(':') {
            installed.name = format!("{}:latest", installed.name);
        }
        self.installed.lock().unwrap().push(installed);
        true
    }

    async fn uninstall_model(&self, name: &str) -> bool {
        let mut installed = self.installed.lock().unwrap();
        let before = installed.len();
        installed.retain(|m| m.name != name);
        installed.len() < before
    }
}

struct Sources {
    local: Arc<FakeSource>,
    remote: Arc<FakeSource>,
    hub: Arc<FakeSource>,
}

fn sources() -> Sources {
    Sources {
        local: Arc::new(
            FakeSource::new(ModelSource::OllamaLocal)
                .with_model("llama2", "Local Ollama model: llama2", &["llama"])
                .with_installed("llama2"),
        ),
        remote: Arc::new(
            FakeSource::new(ModelSource::OllamaRemote)
                .with_model("llama2", "Llama 2 chat models from Meta", &["7b", "13b"])
                .with_model("mistral", "The 7B model released by Mistral AI", &["tools"])
                .with_model("codellama", "A large language model for code", &["code"])
                .with_index_result(Ok(3)),
        ),
        hub: Arc::new(
            FakeSource::new(ModelSource::HuggingFace)
                .with_model("llama2", "Community llama2 conversion", &["text-generation"])
                .with_model("TheBloke/Mistral-7B-GGUF", "GGUF quantisations", &["gguf"]),
        ),
    }
}

fn manager_with(sources: &Sources) -> ModelManager {
    let mut manager = ModelManager::new();
    manager.register_provider(sources.local.clone());
    manager.register_installer(ModelSource::OllamaLocal, sources.local.clone());
    manager.register_provider(sources.remote.clone());
    manager.register_provider(sources.hub.clone());
    manager.register_installer(ModelSource::HuggingFace, sources.hub.clone());
    manager
}

#[tokio::test]
async fn test_same_name_from_different_sources_is_kept() {
    let sources = sources();
    let mut manager = manager_with(&sources);

    let results = manager.search_models("llama2", None, None).await;
    let keys: Vec<ModelKey> = results.iter().map(|m| m.key()).collect();

    assert!(keys.contains(&ModelKey::new("llama2", ModelSource::OllamaLocal)));
    assert!(keys.contains(&ModelKey::new("llama2", ModelSource::OllamaRemote)));
    assert!(keys.contains(&ModelKey::new("llama2", ModelSource::HuggingFace)));
}

#[tokio::test]
async fn test_search_marks_installed_and_ranks() {
    let sources = sources();
    let mut manager = manager_with(&sources);

    let results = manager.search_models("llama2", None, None).await;

    // Local: name 15 + tag 0 + description 5 + installed 3
    assert_eq!(results[0].key(), ModelKey::new("llama2", ModelSource::OllamaLocal));
    assert!(results[0].installed);

    // The library entry counts as installed because local Ollama has it
    let remote = results
        .iter()
        .find(|m| m.source == ModelSource::OllamaRemote)
        .unwrap();
    assert!(remote.installed);

    let hub = results
        .iter()
        .find(|m| m.source == ModelSource::HuggingFace)
        .unwrap();
    assert!(!hub.installed);
}

#[tokio::test]
async fn test_search_without_matches_is_empty() {
    let sources = sources();
    let mut manager = manager_with(&sources);
    assert!(manager
        .search_models("no-such-model-anywhere", None, None)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_search_empty_query_returns_everything_in_source_order() {
    let sources = sources();
    let mut manager = manager_with(&sources);

    let results = manager.search_models("", None, None).await;
    assert_eq!(results.len(), 6);
    assert_eq!(results[0].source, ModelSource::OllamaLocal);
    assert_eq!(results[5].source, ModelSource::HuggingFace);

    let limited = manager.search_models("", None, Some(2)).await;
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_search_respects_source_selection() {
    let sources = sources();
    let mut manager = manager_with(&sources);

    let results = manager
        .search_models("mistral", Some(&[ModelSource::HuggingFace]), None)
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "TheBloke/Mistral-7B-GGUF");
}

#[tokio::test]
async fn test_failing_source_is_skipped() {
    let sources = sources();
    sources.hub.fail_listing.store(true, Ordering::SeqCst);
    let mut manager = manager_with(&sources);

    let results = manager.search_models("llama2", None, None).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|m| m.source != ModelSource::HuggingFace));
}

#[tokio::test]
async fn test_get_model_details() {
    let sources = sources();
    let mut manager = manager_with(&sources);
    manager.refresh_installed_models().await;

    let remote = manager
        .get_model_details("llama2", ModelSource::OllamaRemote)
        .await
        .unwrap();
    assert!(remote.installed);

    let mistral = manager
        .get_model_details("mistral", ModelSource::OllamaRemote)
        .await
        .unwrap();
    assert!(!mistral.installed);

    assert!(manager
        .get_model_details("mistral", ModelSource::OllamaLocal)
        .await
        .is_none());
}

#[tokio::test]
async fn test_install_and_uninstall_track_identity() {
    let sources = sources();
    let mut manager = manager_with(&sources);

    assert!(
        manager
            .install_model("llama2", ModelSource::HuggingFace, None)
            .await
    );
    let installed = manager.list_installed_models().await;
    let keys: Vec<ModelKey> = installed.iter().map(|m| m.key()).collect();
    assert_eq!(
        keys,
        vec![
            ModelKey::new("llama2", ModelSource::OllamaLocal),
            ModelKey::new("llama2", ModelSource::HuggingFace),
        ]
    );

    // Removing the hub copy leaves the local one alone
    assert!(
        manager
            .uninstall_model("llama2", Some(ModelSource::HuggingFace))
            .await
    );
    let remaining = manager.list_installed_models().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source, ModelSource::OllamaLocal);

    // Without a source the first installed one is used
    assert!(manager.uninstall_model("llama2", None).await);
    assert!(manager.list_installed_models().await.is_empty());
    assert!(!manager.uninstall_model("llama2", None).await);
}

#[tokio::test]
async fn test_install_keeps_only_the_reported_tag() {
    let local = Arc::new(
        FakeSource::new(ModelSource::OllamaLocal)
            .with_model("mistral", "Local Ollama model: mistral", &[])
            .tagging_latest(),
    );
    let mut manager = ModelManager::new();
    manager.register_provider(local.clone());
    manager.register_installer(ModelSource::OllamaLocal, local.clone());

    assert!(
        manager
            .install_model("mistral", ModelSource::OllamaLocal, None)
            .await
    );
    let keys: Vec<ModelKey> = manager.installed_models().iter().map(|m| m.key()).collect();
    assert_eq!(keys, vec![ModelKey::new("mistral:latest", ModelSource::OllamaLocal)]);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    manager.save_state(&path).unwrap();
    let mut restored = ModelManager::new();
    assert!(restored.load_state(&path).unwrap());
    let names: Vec<String> = restored.installed_models().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["mistral:latest"]);
}

#[tokio::test]
async fn test_install_failures() {
    let sources = sources();
    let mut manager = manager_with(&sources);

    // The library has no installer
    assert!(
        !manager
            .install_model("mistral", ModelSource::OllamaRemote, None)
            .await
    );
    assert!(
        !manager
            .install_model("broken", ModelSource::OllamaLocal, None)
            .await
    );
    assert_eq!(sources.local.installs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_indices_isolates_failures() {
    let sources = sources();
    let failing = Arc::new(
        FakeSource::new(ModelSource::HuggingFace).with_index_result(Err("rate limited".into())),
    );
    let mut manager = ModelManager::new();
    manager.register_provider(sources.local.clone());
    manager.register_provider(sources.remote.clone());
    manager.register_provider(failing);

    let updates = manager.update_model_indices().await;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].source, ModelSource::OllamaRemote);
    assert_eq!(*updates[0].result.as_ref().unwrap(), 3);
    assert_eq!(updates[1].source, ModelSource::HuggingFace);
    assert!(matches!(updates[1].result, Err(ModelError::Library(_))));
}

#[tokio::test]
async fn test_save_and_load_state_round_trip() {
    let sources = sources();
    let mut manager = manager_with(&sources);
    manager
        .install_model("TheBloke/Mistral-7B-GGUF", ModelSource::HuggingFace, None)
        .await;
    manager.refresh_installed_models().await;
    let before = manager.installed_models();
    assert_eq!(before.len(), 2);

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state").join("model_state.json");
    manager.save_state(&path).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["installed_models"].as_array().unwrap().len(), 2);
    assert_eq!(content["installed_models"][0]["source"], "HUGGINGFACE");

    let mut restored = ModelManager::new();
    assert!(restored.load_state(&path).unwrap());
    assert_eq!(restored.installed_models(), before);
}

#[test]
fn test_load_state_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = ModelManager::new();
    assert!(!manager
        .load_state(&temp_dir.path().join("missing.json"))
        .unwrap());
}

#[test]
fn test_load_state_forces_installed_flag() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("state.json");
    std::fs::write(
        &path,
        r#"{"installed_models":[{"name":"phi","source":"OLLAMA_LOCAL","installed":false}]}"#,
    )
    .unwrap();

    let mut manager = ModelManager::new();
    assert!(manager.load_state(&path).unwrap());
    let models = manager.installed_models();
    assert_eq!(models.len(), 1);
    assert!(models[0].installed);
}
