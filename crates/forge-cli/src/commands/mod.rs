// Command handlers for the ollama-forge CLI

pub mod chat;
pub mod chat_session;
pub mod delete;
pub mod embed;
pub mod generate;
pub mod health;
pub mod list;
pub mod models;
pub mod pull;
pub mod version;

pub use chat::ChatCommand;
pub use chat_session::ChatSessionCommand;
pub use delete::DeleteCommand;
pub use embed::EmbedCommand;
pub use generate::GenerateCommand;
pub use health::HealthCommand;
pub use list::ListCommand;
pub use models::{ModelsAction, ModelsCommand};
pub use pull::PullCommand;
pub use version::VersionCommand;

use forge_client::{FallbackPolicy, ForgeConfig, ModelCandidates, OllamaClient};
use forge_models::ModelManager;

use crate::error::CliResult;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self) -> CliResult<()>;
}

/// Resolved configuration shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    config: ForgeConfig,
}

impl CommandContext {
    pub fn new(config: ForgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn client(&self) -> CliResult<OllamaClient> {
        Ok(OllamaClient::from_config(&self.config)?)
    }

    pub fn manager(&self) -> CliResult<ModelManager> {
        Ok(ModelManager::from_config(&self.config)?)
    }

    /// Chat candidates: an explicit model first, then the configured pair
    pub fn chat_candidates(&self, model: Option<&str>, fallback: bool) -> ModelCandidates {
        Self::candidates(ModelCandidates::chat(&self.config), model, fallback)
    }

    /// Embedding candidates: an explicit model first, then the configured pair
    pub fn embedding_candidates(&self, model: Option<&str>, fallback: bool) -> ModelCandidates {
        Self::candidates(ModelCandidates::embedding(&self.config), model, fallback)
    }

    fn candidates(base: ModelCandidates, model: Option<&str>, fallback: bool) -> ModelCandidates {
        let candidates = match model {
            Some(model) => base.preferring(model),
            None => base,
        };
        if fallback {
            candidates
        } else {
            candidates.with_policy(FallbackPolicy::Never)
        }
    }
}
