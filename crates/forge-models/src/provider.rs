//! Capabilities a model source can offer
//!
//! Every source can list and look up models ([`ModelProvider`]). Sources that
//! can place a model on this machine also implement [`ModelInstaller`].

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{
    error::ModelError,
    model::{ModelInfo, ModelSource},
    progress::DownloadProgress,
    Result,
};

/// Parameters for a provider listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Free-text query; `None` or blank lists everything
    pub query: Option<String>,

    /// Only return models installed on this machine
    pub installed_only: bool,

    pub limit: Option<usize>,

    /// Source-specific filters (e.g., `min_params`, `author`)
    pub filters: BTreeMap<String, String>,
}

impl ListRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn installed() -> Self {
        Self {
            installed_only: true,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// The trimmed query, if it is not blank
    pub fn query_text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Apply the query and limit to an already fetched listing
    pub(crate) fn apply(&self, models: Vec<ModelInfo>) -> Vec<ModelInfo> {
        let query = self.query_text();
        let matching = models
            .into_iter()
            .filter(|m| query.map_or(true, |q| m.matches_query(q)));
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}

/// A source of model listings
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn source(&self) -> ModelSource;

    async fn list_models(&self, request: &ListRequest) -> Result<Vec<ModelInfo>>;

    /// Look up one model by exact name; failures are logged and read as absent
    async fn get_model(&self, name: &str) -> Option<ModelInfo>;

    fn supports_index_update(&self) -> bool {
        false
    }

    /// Rebuild any locally cached index, returning the number of models indexed
    async fn update_index(&self) -> Result<usize> {
        Err(ModelError::UnsupportedSource(self.source()))
    }
}

/// A source that can install and remove models locally
///
/// Both operations report success as a boolean and log the cause of failure.
#[async_trait]
pub trait ModelInstaller: Send + Sync {
    async fn install_model(
        &self,
        model: &ModelInfo,
        progress: Option<&dyn DownloadProgress>,
    ) -> bool;

    async fn uninstall_model(&self, name: &str) -> bool;
}
