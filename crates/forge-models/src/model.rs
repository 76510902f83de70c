//! Data model shared by every model source

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d.]+)\s*([A-Za-z]+)").expect("valid size regex"));

/// Where a model lives
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ModelSource {
    /// Installed in the local Ollama daemon
    #[serde(rename = "OLLAMA_LOCAL")]
    OllamaLocal,
    /// Listed in the public Ollama library
    #[serde(rename = "OLLAMA_REMOTE")]
    OllamaRemote,
    /// Hosted on the Hugging Face hub
    #[serde(rename = "HUGGINGFACE")]
    HuggingFace,
}

impl ModelSource {
    /// Every source, in registration order
    pub const ALL: [ModelSource; 3] = [
        ModelSource::OllamaLocal,
        ModelSource::OllamaRemote,
        ModelSource::HuggingFace,
    ];

    /// Command-line spelling of the source
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSource::OllamaLocal => "ollama-local",
            ModelSource::OllamaRemote => "ollama-remote",
            ModelSource::HuggingFace => "huggingface",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            ModelSource::OllamaLocal => "Ollama (local)",
            ModelSource::OllamaRemote => "Ollama library",
            ModelSource::HuggingFace => "Hugging Face",
        }
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSource {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ollama-local" | "local" => Ok(ModelSource::OllamaLocal),
            "ollama-remote" | "remote" => Ok(ModelSource::OllamaRemote),
            "huggingface" | "hugging-face" | "hf" => Ok(ModelSource::HuggingFace),
            other => Err(ModelError::Validation(format!(
                "Unknown model source '{}'. Expected one of: ollama-local, ollama-remote, huggingface",
                other
            ))),
        }
    }
}

/// A parsed size or parameter count such as `7B` or `3.8GB`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSize {
    pub value: f64,
    pub unit: String,
}

impl ModelSize {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Parse the first `<number><unit>` pair found in `text`
    ///
    /// Returns `None` when no such pair exists or the number is malformed.
    ///
    /// ```
    /// use forge_models::ModelSize;
    ///
    /// let size = ModelSize::parse("7B").unwrap();
    /// assert_eq!(size.value, 7.0);
    /// assert_eq!(size.unit, "B");
    /// assert!(ModelSize::parse("unknown").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let captures = SIZE_PATTERN.captures(text)?;
        let value = captures.get(1)?.as_str().parse::<f64>().ok()?;
        let unit = captures.get(2)?.as_str();
        Some(Self::new(value, unit))
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Identity of a model across sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelKey {
    pub name: String,
    pub source: ModelSource,
}

impl ModelKey {
    pub fn new(name: impl Into<String>, source: ModelSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.source)
    }
}

/// Everything known about one model from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name or repository id (e.g., "llama2:7b", "TheBloke/Llama-2-7B-GGUF")
    pub name: String,

    pub source: ModelSource,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Disk size for installed models, parameter count otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ModelSize>,

    /// Parameter count as reported (e.g., "7B")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,

    /// Context window in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Quantization level (e.g., "Q4_0")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,

    #[serde(default)]
    pub installed: bool,

    /// Source-specific extras (digest, downloads, likes, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, source: ModelSource) -> Self {
        Self {
            name: name.into(),
            source,
            description: String::new(),
            tags: Vec::new(),
            size: None,
            parameters: None,
            context_length: None,
            url: None,
            quantization: None,
            installed: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> ModelKey {
        ModelKey::new(self.name.clone(), self.source)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive substring match on name, description and tags
    ///
    /// An empty query matches everything.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    /// Read a numeric metadata entry
    pub fn metadata_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(|v| v.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_serde_names() {
        let json = serde_json::to_string(&ModelSource::HuggingFace).unwrap();
        assert_eq!(json, "\"HUGGINGFACE\"");
        let parsed: ModelSource = serde_json::from_str("\"OLLAMA_REMOTE\"").unwrap();
        assert_eq!(parsed, ModelSource::OllamaRemote);
    }

    #[test]
    fn test_source_from_cli_spelling() {
        assert_eq!("ollama-local".parse::<ModelSource>().unwrap(), ModelSource::OllamaLocal);
        assert_eq!("HF".parse::<ModelSource>().unwrap(), ModelSource::HuggingFace);
        assert_eq!("ollama_remote".parse::<ModelSource>().unwrap(), ModelSource::OllamaRemote);
        assert!("pypi".parse::<ModelSource>().is_err());
    }

    #[test]
    fn test_size_parse() {
        assert_eq!(ModelSize::parse("7B"), Some(ModelSize::new(7.0, "B")));
        assert_eq!(ModelSize::parse("3.8 GB"), Some(ModelSize::new(3.8, "GB")));
        assert_eq!(ModelSize::parse("1.5b params"), Some(ModelSize::new(1.5, "b")));
        assert_eq!(ModelSize::parse("big"), None);
        assert_eq!(ModelSize::parse("1.2.3B"), None);
        assert_eq!(ModelSize::new(13.0, "B").to_string(), "13B");
    }

    #[test]
    fn test_matches_query() {
        let model = ModelInfo::new("llama2:7b", ModelSource::OllamaLocal)
            .with_description("Meta chat model")
            .with_tags(["chat"]);
        assert!(model.matches_query(""));
        assert!(model.matches_query("LLAMA"));
        assert!(model.matches_query("meta"));
        assert!(model.matches_query("chat"));
        assert!(!model.matches_query("mistral"));
    }
}
