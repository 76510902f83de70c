//! Metadata inferred from model names
//!
//! Names such as `llama2:13b-chat-q4_0` or `mistral-7b-instruct-32k` carry
//! parameter counts, quantization and context length. Extraction sits behind
//! [`MetadataExtractor`] so providers can swap in richer heuristics.

use once_cell::sync::Lazy;
use regex::Regex;

static PARAMS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)[bB]\b").expect("valid parameter regex"));

static QUANT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(q\d+_(?:k_[sml]|k|\d+))\b").expect("valid quantization regex")
});

static SHORT_QUANT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[-.](q\d+)\b").expect("valid short quantization regex"));

static CONTEXT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)k\b").expect("valid context regex"));

const KNOWN_FAMILIES: &[&str] = &[
    "llama", "mistral", "stable", "phi", "vicuna", "falcon", "mpt",
];

/// What a name reveals about a model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    /// e.g. `7B`, `1.5B`
    pub parameters: Option<String>,
    /// Upper-cased, e.g. `Q4_0`, `Q5_K_M`
    pub quantization: Option<String>,
    pub context_length: Option<u64>,
    pub tags: Vec<String>,
}

pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, name: &str) -> ExtractedMetadata;
}

/// Regex heuristics over the model name
#[derive(Debug, Clone, Copy, Default)]
pub struct NameHeuristicExtractor;

impl NameHeuristicExtractor {
    pub fn parameters(name: &str) -> Option<String> {
        PARAMS_PATTERN
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| format!("{}B", m.as_str()))
    }

    pub fn quantization(name: &str) -> Option<String> {
        QUANT_PATTERN
            .captures(name)
            .or_else(|| SHORT_QUANT_PATTERN.captures(name))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_uppercase())
    }

    pub fn context_length(name: &str) -> Option<u64> {
        let lower = name.to_lowercase();
        CONTEXT_PATTERN
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .and_then(|k| k.checked_mul(1000))
    }
}

impl MetadataExtractor for NameHeuristicExtractor {
    fn extract(&self, name: &str) -> ExtractedMetadata {
        let lower = name.to_lowercase();
        let parameters = Self::parameters(name);
        let quantization = Self::quantization(name);
        let context_length = Self::context_length(name);

        let mut tags: Vec<String> = KNOWN_FAMILIES
            .iter()
            .filter(|family| lower.contains(*family))
            .map(|family| family.to_string())
            .collect();
        if let Some(q) = &quantization {
            tags.push(format!("quantized-{}", q.to_lowercase()));
        }
        if let Some(p) = &parameters {
            tags.push(format!("params-{}", p.to_lowercase()));
        }
        if let Some(ctx) = context_length {
            tags.push(format!("context-{}k", ctx / 1000));
        }

        ExtractedMetadata {
            parameters,
            quantization,
            context_length,
            tags,
        }
    }
}
