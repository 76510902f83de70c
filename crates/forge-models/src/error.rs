//! Error types for model management operations

use forge_client::ClientError;
use thiserror::Error;

use crate::model::ModelSource;

/// Errors that can occur during model management operations
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Ollama API error: {0}")]
    OllamaApi(#[from] ClientError),

    #[error("Hugging Face API error: {0}")]
    HuggingFaceApi(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Indexing error: {0}")]
    Indexing(String),

    #[error("Ollama library error: {0}")]
    Library(String),

    #[error("Operation not supported by source {0}")]
    UnsupportedSource(ModelSource),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
