//! Error types for Ollama client operations

use thiserror::Error;

/// Errors that can occur while talking to the Ollama API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Ollama API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Ollama server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("All candidate models failed: {}", describe_attempts(.attempts))]
    AllCandidatesFailed { attempts: Vec<(String, String)> },
}

fn describe_attempts(attempts: &[(String, String)]) -> String {
    attempts
        .iter()
        .map(|(model, error)| format!("{} ({})", model, error))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ClientError {
    /// Map a non-success HTTP status and its body to an error
    pub fn from_status(status: u16, body: String) -> Self {
        let message = extract_error_message(&body);
        match status {
            404 => ClientError::ModelNotFound(message),
            400 => ClientError::InvalidRequest(message),
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Api { status, message },
        }
    }

    /// Whether the error means the requested model cannot serve the request
    pub fn is_model_unavailable(&self) -> bool {
        matches!(
            self,
            ClientError::ModelNotFound(_) | ClientError::Server { .. }
        )
    }

    /// Whether the request may succeed if simply repeated
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::Timeout(_) | ClientError::Server { .. }
        )
    }
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::from_status(status.as_u16(), err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}
