//! Request and response types for the Ollama HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /api/version`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionResponse {
    pub version: String,
}

/// Response of `GET /api/tags`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagModel>,
}

/// A locally installed model as reported by `/api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagModel {
    /// Model name/ID (e.g., "mistral:latest")
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    /// Model size in bytes
    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub digest: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TagDetails>,
}

/// Model details block of a tag entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,

    /// Parameter size (e.g., "7B", "13B")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,

    /// Quantization level (e.g., "Q4_0", "Q5_K_M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Sampling options forwarded as the `options` object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: false,
            options: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A complete response or a single streamed chunk of `/api/generate`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

/// A chat turn
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            options: None,
        }
    }
}

/// A complete response or a single streamed chunk of `/api/chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub message: ChatMessage,
    #[serde(default)]
    pub done: bool,
}

/// Body of `POST /api/embed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedRequest {
    pub model: String,
    pub input: Vec<String>,
}

impl EmbedRequest {
    pub fn new(model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: vec![input.into()],
        }
    }

    pub fn batch(model: impl Into<String>, input: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input,
        }
    }
}

/// Response of `/api/embed`; older servers answer with a single `embedding`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmbedResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub embeddings: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f64>>,
}

impl EmbedResponse {
    /// Fold the legacy single-vector field into `embeddings`
    pub(crate) fn normalized(mut self) -> Self {
        if self.embeddings.is_empty() {
            if let Some(vector) = self.embedding.take() {
                self.embeddings.push(vector);
            }
        }
        self
    }

    /// First embedding vector, if any
    pub fn first(&self) -> Option<&[f64]> {
        self.embeddings.first().map(|v| v.as_slice())
    }
}

/// Progress information for model pull operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullProgress {
    /// Model name being pulled
    pub model: String,

    /// Current status message
    pub status: String,

    /// Layer digest, empty for status-only lines
    pub digest: String,

    /// Total bytes to download
    pub total: u64,

    /// Bytes downloaded so far
    pub completed: u64,
}

impl PullProgress {
    /// Get the progress percentage (0-100)
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Check if the current layer is complete
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total && self.total > 0
    }

    /// Ollama closes a pull with a `success` status line
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
