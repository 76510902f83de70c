//! Forge configuration management
//!
//! Handles loading and validating configuration from:
//! 1. Environment variables (highest priority)
//! 2. An explicit file passed on the command line
//! 3. Project config file (.ollama-forge/config.yaml)
//! 4. Global config file (<config dir>/ollama-forge/config.yaml)
//! 5. Built-in defaults (lowest priority)

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{error::ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "deepseek-r1:1.5b";
pub const BACKUP_CHAT_MODEL: &str = "qwen2.5:0.5b-Instruct";
pub const DEFAULT_EMBEDDING_MODEL: &str = "deepseek-r1:1.5b";
pub const BACKUP_EMBEDDING_MODEL: &str = "qwen2.5:0.5b-Instruct";
pub const DEFAULT_HUGGINGFACE_API_URL: &str = "https://huggingface.co";
pub const DEFAULT_LIBRARY_URL: &str = "https://ollama.com/library";

const REMOTE_INDEX_FILE: &str = "ollama_remote_index.json";
const STATE_FILE: &str = "model_state.json";

/// Configuration shared by the client, the providers, and the manager
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForgeConfig {
    /// Base URL of the Ollama daemon
    pub api_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient request failures
    pub max_retries: u32,
    pub chat_model: String,
    pub backup_chat_model: String,
    pub embedding_model: String,
    pub backup_embedding_model: String,
    pub huggingface_api_url: String,
    /// Root page of the Ollama model library
    pub library_url: String,
    /// Directory holding indices and state snapshots
    pub cache_dir: PathBuf,
    /// Explicit remote index location; defaults to a file inside `cache_dir`
    pub remote_index_path: Option<PathBuf>,
    /// Explicit state snapshot location; defaults to a file inside `cache_dir`
    pub state_path: Option<PathBuf>,
    pub scraper_concurrency: usize,
    pub scraper_retries: u32,
    pub scraper_retry_delay_secs: u64,
    pub fetch_detailed_info: bool,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 60,
            max_retries: 3,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            backup_chat_model: BACKUP_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            backup_embedding_model: BACKUP_EMBEDDING_MODEL.to_string(),
            huggingface_api_url: DEFAULT_HUGGINGFACE_API_URL.to_string(),
            library_url: DEFAULT_LIBRARY_URL.to_string(),
            cache_dir: default_cache_dir(),
            remote_index_path: None,
            state_path: None,
            scraper_concurrency: 5,
            scraper_retries: 3,
            scraper_retry_delay_secs: 2,
            fetch_detailed_info: false,
        }
    }
}

/// `<data dir>/ollama-forge/cache`, or `./ollama-forge/cache` without a data dir
fn default_cache_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ollama-forge")
        .join("cache")
}

impl ForgeConfig {
    /// Load configuration with precedence: defaults, global file, project
    /// file, environment
    pub fn load_with_precedence() -> Result<Self> {
        Self::load(None)
    }

    /// Same as [`ForgeConfig::load_with_precedence`], with an extra file
    /// applied after the project file and before the environment
    pub fn load(extra_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let global_config_path = Self::get_global_config_path();
        if global_config_path.exists() {
            debug!("Loading global config from {:?}", global_config_path);
            config.merge_from_file(&global_config_path)?;
        }

        let project_config_path = Self::get_project_config_path();
        if project_config_path.exists() {
            debug!("Loading project config from {:?}", project_config_path);
            config.merge_from_file(&project_config_path)?;
        }

        if let Some(path) = extra_file {
            if !path.exists() {
                return Err(ClientError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!("Loading config from {:?}", path);
            config.merge_from_file(path)?;
        }

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Global configuration path, honouring `OLLAMA_FORGE_CONFIG_DIR`
    pub fn get_global_config_path() -> PathBuf {
        let dir = std::env::var("OLLAMA_FORGE_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("ollama-forge")
            });
        dir.join("config.yaml")
    }

    /// Project configuration path (.ollama-forge/config.yaml)
    pub fn get_project_config_path() -> PathBuf {
        PathBuf::from(".ollama-forge/config.yaml")
    }

    /// Apply `OLLAMA_FORGE_*` environment variables over the current values
    pub fn load_from_env(&mut self) {
        if let Ok(url) = std::env::var("OLLAMA_FORGE_API_URL") {
            debug!("Loading OLLAMA_FORGE_API_URL from environment: {}", url);
            self.api_url = url;
        }

        if let Ok(value) = std::env::var("OLLAMA_FORGE_TIMEOUT_SECS") {
            match value.parse::<u64>() {
                Ok(timeout) => self.timeout_secs = timeout,
                Err(_) => warn!("Invalid OLLAMA_FORGE_TIMEOUT_SECS value: {}", value),
            }
        }

        if let Ok(value) = std::env::var("OLLAMA_FORGE_MAX_RETRIES") {
            match value.parse::<u32>() {
                Ok(retries) => self.max_retries = retries,
                Err(_) => warn!("Invalid OLLAMA_FORGE_MAX_RETRIES value: {}", value),
            }
        }

        if let Ok(model) = std::env::var("OLLAMA_FORGE_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Ok(model) = std::env::var("OLLAMA_FORGE_BACKUP_CHAT_MODEL") {
            self.backup_chat_model = model;
        }
        if let Ok(model) = std::env::var("OLLAMA_FORGE_EMBEDDING_MODEL") {
            self.embedding_model = model;
        }

        if let Ok(dir) = std::env::var("OLLAMA_FORGE_CACHE_DIR") {
            debug!("Loading OLLAMA_FORGE_CACHE_DIR from environment: {}", dir);
            self.cache_dir = PathBuf::from(dir);
        }
    }

    /// Merge configuration from a YAML file; only keys present in the file
    /// override current values
    pub fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let file_config: FileConfig = serde_yaml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        if let Some(ollama) = file_config.ollama {
            if let Some(api_url) = ollama.api_url {
                self.api_url = api_url;
            }
            if let Some(timeout_secs) = ollama.timeout_secs {
                self.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = ollama.max_retries {
                self.max_retries = max_retries;
            }
        }

        if let Some(models) = file_config.models {
            if let Some(chat) = models.chat {
                self.chat_model = chat;
            }
            if let Some(backup_chat) = models.backup_chat {
                self.backup_chat_model = backup_chat;
            }
            if let Some(embedding) = models.embedding {
                self.embedding_model = embedding;
            }
            if let Some(backup_embedding) = models.backup_embedding {
                self.backup_embedding_model = backup_embedding;
            }
        }

        if let Some(sources) = file_config.sources {
            if let Some(url) = sources.huggingface_api_url {
                self.huggingface_api_url = url;
            }
            if let Some(url) = sources.library_url {
                self.library_url = url;
            }
        }

        if let Some(paths) = file_config.paths {
            if let Some(cache_dir) = paths.cache_dir {
                self.cache_dir = cache_dir;
            }
            if let Some(remote_index) = paths.remote_index {
                self.remote_index_path = Some(remote_index);
            }
            if let Some(state) = paths.state {
                self.state_path = Some(state);
            }
        }

        if let Some(scraper) = file_config.scraper {
            if let Some(concurrency) = scraper.concurrency {
                self.scraper_concurrency = concurrency;
            }
            if let Some(retries) = scraper.retries {
                self.scraper_retries = retries;
            }
            if let Some(delay) = scraper.retry_delay_secs {
                self.scraper_retry_delay_secs = delay;
            }
            if let Some(detailed) = scraper.fetch_detailed_info {
                self.fetch_detailed_info = detailed;
            }
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (label, url) in [
            ("Ollama API URL", &self.api_url),
            ("Hugging Face API URL", &self.huggingface_api_url),
            ("Ollama library URL", &self.library_url),
        ] {
            if url.is_empty() {
                return Err(ClientError::Config(format!("{} cannot be empty", label)));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ClientError::Config(format!(
                    "{} must start with http:// or https://: {}",
                    label, url
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(ClientError::Config(
                "Timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.chat_model.is_empty() {
            return Err(ClientError::Config(
                "Chat model cannot be empty".to_string(),
            ));
        }

        if self.scraper_concurrency == 0 {
            return Err(ClientError::Config(
                "Scraper concurrency must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scraper_retry_delay(&self) -> Duration {
        Duration::from_secs(self.scraper_retry_delay_secs)
    }

    /// Location of the scraped remote library index
    pub fn remote_index_path(&self) -> PathBuf {
        self.remote_index_path
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(REMOTE_INDEX_FILE))
    }

    /// Location of the installed-models snapshot
    pub fn state_path(&self) -> PathBuf {
        self.state_path
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(STATE_FILE))
    }
}

/// YAML file structure (all sections optional)
#[derive(Debug, Deserialize)]
struct FileConfig {
    ollama: Option<OllamaFileSettings>,
    models: Option<ModelFileSettings>,
    sources: Option<SourceFileSettings>,
    paths: Option<PathFileSettings>,
    scraper: Option<ScraperFileSettings>,
}

#[derive(Debug, Deserialize)]
struct OllamaFileSettings {
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ModelFileSettings {
    chat: Option<String>,
    backup_chat: Option<String>,
    embedding: Option<String>,
    backup_embedding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceFileSettings {
    huggingface_api_url: Option<String>,
    library_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PathFileSettings {
    cache_dir: Option<PathBuf>,
    remote_index: Option<PathBuf>,
    state: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ScraperFileSettings {
    concurrency: Option<usize>,
    retries: Option<u32>,
    retry_delay_secs: Option<u64>,
    fetch_detailed_info: Option<bool>,
}
