//! Ollama client for Ollama Forge
//!
//! This crate provides the HTTP client for a local Ollama daemon together with
//! the pieces every other Forge crate shares: the layered [`ForgeConfig`], the
//! candidate-list fallback policy, server version checks, and embedding math.

pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fallback;
pub mod models;
pub mod retry;
pub mod version;

pub use client::OllamaClient;
pub use config::ForgeConfig;
pub use embedding::{
    batch_calculate_similarities, calculate_similarity, extract_embedding, normalize_vector,
    top_k_similarities,
};
pub use error::ClientError;
pub use fallback::{FallbackPolicy, ModelCandidates};
pub use models::{
    ChatMessage, ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, GenerateRequest,
    GenerateResponse, GenerationOptions, PullProgress, TagDetails, TagModel, TagsResponse,
    VersionResponse,
};
pub use version::{is_compatible_ollama_version, parse_version, MINIMUM_OLLAMA_VERSION};

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
