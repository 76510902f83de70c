//! Fallback helpers for model selection
//!
//! A request is attempted against an ordered list of candidate models. The
//! [`FallbackPolicy`] decides which failures move on to the next candidate.

use std::future::Future;

use tracing::{debug, warn};

use crate::{config::ForgeConfig, error::ClientError, Result};

/// Which failures trigger a move to the next candidate model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Only the first candidate is ever tried
    Never,
    /// Fall back when the model is missing or the server failed to serve it
    OnModelUnavailable,
    /// Fall back on any failure
    #[default]
    OnAnyError,
}

impl FallbackPolicy {
    /// Whether `err` should move on to the next candidate
    pub fn should_fall_back(&self, err: &ClientError) -> bool {
        match self {
            FallbackPolicy::Never => false,
            FallbackPolicy::OnModelUnavailable => {
                err.is_model_unavailable() || err.is_transient()
            }
            FallbackPolicy::OnAnyError => true,
        }
    }
}

/// Ordered, non-empty list of models to try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidates {
    models: Vec<String>,
    policy: FallbackPolicy,
}

impl ModelCandidates {
    /// A single candidate with the default policy
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            models: vec![primary.into()],
            policy: FallbackPolicy::default(),
        }
    }

    /// Exactly one model, never falling back
    pub fn single(model: impl Into<String>) -> Self {
        Self::new(model).with_policy(FallbackPolicy::Never)
    }

    /// Chat model followed by its configured backup
    pub fn chat(config: &ForgeConfig) -> Self {
        Self::new(config.chat_model.clone()).with_fallback(config.backup_chat_model.clone())
    }

    /// Embedding model followed by its configured backup
    pub fn embedding(config: &ForgeConfig) -> Self {
        Self::new(config.embedding_model.clone())
            .with_fallback(config.backup_embedding_model.clone())
    }

    /// Append a fallback; blanks and duplicates are ignored
    pub fn with_fallback(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.is_empty() && !self.models.contains(&model) {
            self.models.push(model);
        }
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Put `model` first, keeping the rest of the list as fallbacks
    pub fn preferring(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if model.is_empty() {
            return self;
        }
        self.models.retain(|m| m != &model);
        self.models.insert(0, model);
        self
    }

    pub fn primary(&self) -> &str {
        &self.models[0]
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Run `attempt` against each candidate until one succeeds
    ///
    /// Returns the model that produced the result alongside it. An error the
    /// policy does not cover is returned as-is; exhausting the list yields
    /// [`ClientError::AllCandidatesFailed`].
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<(String, T)>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures = Vec::new();

        for (index, model) in self.models.iter().enumerate() {
            match attempt(model.clone()).await {
                Ok(value) => {
                    if index > 0 {
                        debug!("Fallback model {} succeeded", model);
                    }
                    return Ok((model.clone(), value));
                }
                Err(err) => {
                    if !self.policy.should_fall_back(&err) {
                        return Err(err);
                    }
                    warn!("Model {} failed: {}", model, err);
                    failures.push((model.clone(), err.to_string()));
                }
            }
        }

        Err(ClientError::AllCandidatesFailed { attempts: failures })
    }
}
