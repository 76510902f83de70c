//! Model management for Ollama Forge
//!
//! This crate unifies three model sources behind the [`ModelProvider`] and
//! [`ModelInstaller`] capabilities:
//!
//! - models installed in the local Ollama daemon
//! - the public Ollama library, through a locally persisted scraped index
//! - the Hugging Face model hub
//!
//! [`ModelManager`] fans searches out across the registered sources, scores
//! and merges the results, tracks installed state keyed by `(name, source)`,
//! and snapshots that state to disk.

pub mod error;
pub mod extract;
pub mod library;
pub mod manager;
pub mod model;
pub mod progress;
pub mod provider;
pub mod providers;
pub mod scoring;

pub use error::ModelError;
pub use extract::{ExtractedMetadata, MetadataExtractor, NameHeuristicExtractor};
pub use manager::{IndexUpdate, ModelManager};
pub use model::{ModelInfo, ModelKey, ModelSize, ModelSource};
pub use progress::{DownloadProgress, LoggingProgress};
pub use provider::{ListRequest, ModelInstaller, ModelProvider};
pub use providers::{
    HuggingFaceModelProvider, OllamaLocalModelProvider, OllamaRemoteModelProvider,
};

/// Result type for model management operations
pub type Result<T> = std::result::Result<T, ModelError>;
