//! HTTP client for a local Ollama daemon
//!
//! Covers the endpoints Forge needs: version, tags, generate, chat, embed,
//! pull and delete. Streaming endpoints are exposed as newline-delimited JSON
//! streams read incrementally from the response body.
//!
//! The configured timeout bounds a whole request for the buffered endpoints.
//! Streams have no overall limit; instead the same duration bounds the wait
//! for each chunk, so a long pull keeps going as long as data arrives.

use std::{sync::Arc, time::Duration};

use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use reqwest::{Client, Method, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::{
    config::{ForgeConfig, DEFAULT_API_URL},
    error::ClientError,
    fallback::ModelCandidates,
    models::{
        ChatRequest, ChatResponse, EmbedRequest, EmbedResponse, GenerateRequest,
        GenerateResponse, PullProgress, TagsResponse, VersionResponse,
    },
    retry::execute_with_retry,
    version::is_compatible_ollama_version,
    Result,
};

/// Default timeout for Ollama API requests (60 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default retries for transient failures
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default pool idle timeout (90 seconds)
const DEFAULT_POOL_IDLE_TIMEOUT_SECS: u64 = 90;

/// Default TCP keep-alive interval (60 seconds)
const DEFAULT_TCP_KEEPALIVE_SECS: u64 = 60;

/// Health check timeout (2 seconds)
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 2;

/// One line of the pull stream
#[derive(Debug, Deserialize)]
struct OllamaPullLine {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    completed: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ModelNameBody<'a> {
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct PullBody<'a> {
    model: &'a str,
    stream: bool,
}

/// Ollama API client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaClient {
    /// Create a new client with default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new client with a custom timeout
    ///
    /// # Errors
    /// Returns `Config` if `base_url` is empty
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into());
        if base_url.is_empty() {
            return Err(ClientError::Config(
                "Ollama base URL is required".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(DEFAULT_TCP_KEEPALIVE_SECS))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            timeout,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a client against the default localhost endpoint
    pub fn with_default_endpoint() -> Result<Self> {
        Self::new(DEFAULT_API_URL)
    }

    /// Create a client from configuration
    pub fn from_config(config: &ForgeConfig) -> Result<Self> {
        debug!(
            "Creating OllamaClient from configuration: api_url={}, timeout={}s",
            config.api_url, config.timeout_secs
        );
        Ok(Self::with_timeout(config.api_url.clone(), config.timeout())?
            .with_max_retries(config.max_retries))
    }

    /// Override the number of retries for transient failures
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a buffered request, bounded as a whole by the client timeout
    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.dispatch(method, path, body, Some(self.timeout)).await
    }

    /// Send a request whose body is read as a stream
    ///
    /// No overall deadline; `ndjson_stream` bounds the gap between chunks.
    async fn send_streaming<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        self.dispatch(method, path, body, None).await
    }

    /// Send with retries and turn non-success statuses into errors
    async fn dispatch<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        total_timeout: Option<Duration>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        let client = self.client.clone();

        let response = execute_with_retry(self.max_retries, || {
            let mut request = client.request(method.clone(), &url);
            if let Some(timeout) = total_timeout {
                request = request.timeout(timeout);
            }
            if let Some(body) = body {
                request = request.json(body);
            }
            request.send()
        })
        .await
        .map_err(|e| {
            error!("Request to {} failed after retries: {}", path, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Ollama API error on {} ({}): {}", path, status, error_text);
            return Err(ClientError::from_status(status.as_u16(), error_text));
        }

        Ok(response)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body).await?;
        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", path, e);
            ClientError::Parse(e.to_string())
        })
    }

    /// Get the server version
    pub async fn version(&self) -> Result<VersionResponse> {
        self.send_json::<(), _>(Method::GET, "/api/version", None).await
    }

    /// Check if the Ollama server is reachable and responding
    ///
    /// Uses a short timeout and no retries. Never errors: an unreachable
    /// server simply reports `false`.
    pub async fn health_check(&self) -> bool {
        debug!("Performing health check on Ollama server at {}", self.base_url);

        match self
            .client
            .get(self.endpoint("/api/version"))
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) => {
                let healthy = response.status().is_success();
                if !healthy {
                    warn!("Ollama server health check failed: HTTP {}", response.status());
                }
                healthy
            }
            Err(e) => {
                warn!("Ollama server health check failed: {}", e);
                false
            }
        }
    }

    /// Fetch the server version and compare it with the supported minimum
    pub async fn check_compatibility(&self) -> Result<bool> {
        let version = self.version().await?;
        let compatible = is_compatible_ollama_version(&version.version);
        if !compatible {
            warn!("Ollama version {} is older than supported", version.version);
        }
        Ok(compatible)
    }

    /// List locally installed models
    pub async fn list_models(&self) -> Result<TagsResponse> {
        debug!("Listing local models");
        let tags: TagsResponse = self.send_json::<(), _>(Method::GET, "/api/tags", None).await?;
        debug!("Listed {} models", tags.models.len());
        Ok(tags)
    }

    /// Generate a completion, waiting for the full response
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        debug!("Generating with model: {}", request.model);
        let mut request = request.clone();
        request.stream = false;
        self.send_json(Method::POST, "/api/generate", Some(&request))
            .await
    }

    /// Generate a completion as a stream of partial responses
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<BoxStream<'static, Result<GenerateResponse>>> {
        debug!("Starting streaming generation with model: {}", request.model);
        let mut request = request.clone();
        request.stream = true;
        let response = self
            .send_streaming(Method::POST, "/api/generate", Some(&request))
            .await?;
        Ok(ndjson_stream(response, self.timeout))
    }

    /// Send a chat request, waiting for the full response
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!("Sending chat request for model: {}", request.model);
        let mut request = request.clone();
        request.stream = false;
        self.send_json(Method::POST, "/api/chat", Some(&request)).await
    }

    /// Send a chat request and stream the reply
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<ChatResponse>>> {
        debug!("Starting streaming chat for model: {}", request.model);
        let mut request = request.clone();
        request.stream = true;
        let response = self
            .send_streaming(Method::POST, "/api/chat", Some(&request))
            .await?;
        Ok(ndjson_stream(response, self.timeout))
    }

    /// Create embeddings for the request input
    pub async fn embed(&self, request: &EmbedRequest) -> Result<EmbedResponse> {
        if request.input.is_empty() {
            return Err(ClientError::Validation(
                "Embedding input cannot be empty".to_string(),
            ));
        }
        debug!("Embedding {} inputs with model: {}", request.input.len(), request.model);
        let response: EmbedResponse = self.send_json(Method::POST, "/api/embed", Some(request)).await?;
        Ok(response.normalized())
    }

    /// Pull a model, yielding progress updates as they arrive
    pub async fn pull_stream(
        &self,
        model_name: &str,
    ) -> Result<BoxStream<'static, Result<PullProgress>>> {
        if model_name.is_empty() {
            return Err(ClientError::Validation(
                "Model name cannot be empty".to_string(),
            ));
        }

        debug!("Pulling model: {}", model_name);
        let body = PullBody {
            model: model_name,
            stream: true,
        };
        let response = self
            .send_streaming(Method::POST, "/api/pull", Some(&body))
            .await?;

        let model = model_name.to_string();
        let stream = ndjson_stream::<OllamaPullLine>(response, self.timeout).map(move |line| {
            let line = line?;
            if let Some(message) = line.error {
                error!("Pull of {} failed: {}", model, message);
                return Err(ClientError::Stream(message));
            }
            Ok(PullProgress {
                model: model.clone(),
                status: line.status.unwrap_or_default(),
                digest: line.digest.unwrap_or_default(),
                total: line.total.unwrap_or(0),
                completed: line.completed.unwrap_or(0),
            })
        });

        Ok(stream.boxed())
    }

    /// Pull a model and collect every progress update
    pub async fn pull(&self, model_name: &str) -> Result<Vec<PullProgress>> {
        let updates: Vec<PullProgress> = self.pull_stream(model_name).await?.try_collect().await?;
        info!("Successfully pulled model: {}", model_name);
        Ok(updates)
    }

    /// Remove a model from local storage
    pub async fn delete(&self, model_name: &str) -> Result<()> {
        if model_name.is_empty() {
            return Err(ClientError::Validation(
                "Model name cannot be empty".to_string(),
            ));
        }

        debug!("Deleting model: {}", model_name);
        let body = ModelNameBody { model: model_name };
        match self.send(Method::DELETE, "/api/delete", Some(&body)).await {
            Ok(_) => {
                info!("Successfully deleted model: {}", model_name);
                Ok(())
            }
            Err(ClientError::ModelNotFound(_)) => {
                Err(ClientError::ModelNotFound(model_name.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Generate with each candidate model in turn until one succeeds
    pub async fn generate_with_fallback(
        &self,
        candidates: &ModelCandidates,
        request: &GenerateRequest,
    ) -> Result<(String, GenerateResponse)> {
        candidates
            .run(|model| {
                let mut request = request.clone();
                request.model = model;
                async move { self.generate(&request).await }
            })
            .await
    }

    /// Chat with each candidate model in turn until one succeeds
    pub async fn chat_with_fallback(
        &self,
        candidates: &ModelCandidates,
        request: &ChatRequest,
    ) -> Result<(String, ChatResponse)> {
        candidates
            .run(|model| {
                let mut request = request.clone();
                request.model = model;
                async move { self.chat(&request).await }
            })
            .await
    }

    /// Embed with each candidate model in turn until one succeeds
    pub async fn embed_with_fallback(
        &self,
        candidates: &ModelCandidates,
        request: &EmbedRequest,
    ) -> Result<(String, EmbedResponse)> {
        candidates
            .run(|model| {
                let mut request = request.clone();
                request.model = model;
                async move { self.embed(&request).await }
            })
            .await
    }
}

/// Strip trailing slashes and a trailing `/api` segment
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/api")
        .unwrap_or(trimmed)
        .to_string()
}

/// Incremental line reader over a response body
struct LineReader {
    response: Response,
    buffer: Vec<u8>,
    finished: bool,
    idle_timeout: Duration,
}

impl LineReader {
    async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.finished {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = std::mem::take(&mut self.buffer);
                return Ok(Some(String::from_utf8_lossy(&rest).into_owned()));
            }

            let chunk = tokio::time::timeout(self.idle_timeout, self.response.chunk())
                .await
                .map_err(|_| {
                    ClientError::Timeout(format!(
                        "no data received for {}s",
                        self.idle_timeout.as_secs_f64()
                    ))
                })??;
            match chunk {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => self.finished = true,
            }
        }
    }
}

/// Turn an NDJSON response body into a stream of parsed items
///
/// Malformed lines are logged and skipped. Transport errors, and a wait of
/// more than `idle_timeout` for the next chunk, end the stream after being
/// yielded once.
fn ndjson_stream<T>(response: Response, idle_timeout: Duration) -> BoxStream<'static, Result<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let reader = LineReader {
        response,
        buffer: Vec::new(),
        finished: false,
        idle_timeout,
    };

    futures::stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        loop {
            match reader.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<T>(line) {
                        Ok(item) => return Some((Ok(item), Some(reader))),
                        Err(e) => warn!("Failed to parse streaming response line: {}", e),
                    }
                }
                Ok(None) => return None,
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
    .boxed()
}
