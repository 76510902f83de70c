//! Tests for the local Ollama provider against a mock daemon

use std::sync::Mutex;

use forge_client::OllamaClient;
use forge_models::{
    DownloadProgress, ListRequest, ModelInfo, ModelInstaller, ModelProvider, ModelSize,
    ModelSource, OllamaLocalModelProvider,
};
use mockito::Matcher;
use serde_json::json;

const TAGS_BODY: &str = r#"{
  "models": [
    {
      "name": "llama2:latest",
      "modified_at": "2024-01-15T10:30:00Z",
      "size": 3826793677,
      "digest": "sha256:78e26419b446",
      "details": {
        "format": "gguf",
        "family": "llama",
        "parameter_size": "7B",
        "quantization_level": "Q4_0"
      }
    },
    {
      "name": "mistral-7b-instruct-32k:q5_k_m",
      "size": 0,
      "digest": "sha256:abc"
    }
  ]
}"#;

#[derive(Default)]
struct RecordingProgress {
    updates: Mutex<Vec<(u64, u64)>>,
}

impl DownloadProgress for RecordingProgress {
    fn update(&self, bytes_downloaded: u64, total_bytes: u64) {
        self.updates
            .lock()
            .unwrap()
            .push((bytes_downloaded, total_bytes));
    }
}

fn provider_for(server: &mockito::ServerGuard) -> OllamaLocalModelProvider {
    let client = OllamaClient::new(server.url()).unwrap().with_max_retries(0);
    OllamaLocalModelProvider::new(client)
}

#[tokio::test]
async fn test_list_models_converts_tags() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(TAGS_BODY)
        .create_async()
        .await;

    let provider = provider_for(&server);
    let models = provider.list_models(&ListRequest::all()).await.unwrap();
    mock.assert_async().await;

    assert_eq!(models.len(), 2);
    let llama = &models[0];
    assert_eq!(llama.name, "llama2:latest");
    assert_eq!(llama.source, ModelSource::OllamaLocal);
    assert!(llama.installed);
    assert_eq!(llama.description, "Local Ollama model: llama2:latest");
    assert_eq!(llama.parameters.as_deref(), Some("7B"));
    assert_eq!(llama.quantization.as_deref(), Some("Q4_0"));
    assert_eq!(llama.size, Some(ModelSize::new(3.6, "GB")));
    assert_eq!(llama.metadata["digest"], json!("sha256:78e26419b446"));
    assert_eq!(llama.metadata["family"], json!("llama"));
    assert_eq!(llama.metadata["size_bytes"], json!(3826793677u64));
    assert!(llama.metadata.contains_key("modified_at"));
    assert!(llama.tags.contains(&"llama".to_string()));

    // No details block: everything comes from the name
    let mistral = &models[1];
    assert_eq!(mistral.parameters.as_deref(), Some("7B"));
    assert_eq!(mistral.quantization.as_deref(), Some("Q5_K_M"));
    assert_eq!(mistral.context_length, Some(32_000));
    assert_eq!(mistral.size, None);
    assert!(!mistral.metadata.contains_key("family"));
}

#[tokio::test]
async fn test_list_models_applies_query_and_limit() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(TAGS_BODY)
        .expect(3)
        .create_async()
        .await;

    let provider = provider_for(&server);

    let models = provider
        .list_models(&ListRequest::query("MISTRAL"))
        .await
        .unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "mistral-7b-instruct-32k:q5_k_m");

    let none = provider
        .list_models(&ListRequest::query("phi3"))
        .await
        .unwrap();
    assert!(none.is_empty());

    let limited = provider
        .list_models(&ListRequest::all().with_limit(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn test_list_models_propagates_daemon_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(400)
        .with_body(r#"{"error":"bad request"}"#)
        .create_async()
        .await;

    let provider = provider_for(&server);
    assert!(provider.list_models(&ListRequest::all()).await.is_err());
}

#[tokio::test]
async fn test_get_model_matches_latest_tag() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(TAGS_BODY)
        .expect(3)
        .create_async()
        .await;

    let provider = provider_for(&server);
    let by_short_name = provider.get_model("llama2").await.unwrap();
    assert_eq!(by_short_name.name, "llama2:latest");
    assert!(provider.get_model("llama2:latest").await.is_some());
    assert!(provider.get_model("llama").await.is_none());
}

#[tokio::test]
async fn test_get_model_when_daemon_is_down() {
    let client = OllamaClient::new("http://127.0.0.1:1")
        .unwrap()
        .with_max_retries(0);
    let provider = OllamaLocalModelProvider::new(client);
    assert!(provider.get_model("llama2").await.is_none());
}

#[tokio::test]
async fn test_install_reports_cumulative_progress() {
    let mut server = mockito::Server::new_async().await;
    let body = [
        json!({"status": "pulling manifest"}),
        json!({"status": "downloading", "digest": "sha256:a", "total": 100, "completed": 40}),
        json!({"status": "downloading", "digest": "sha256:b", "total": 50, "completed": 50}),
        json!({"status": "downloading", "digest": "sha256:a", "total": 100, "completed": 100}),
        json!({"status": "success"}),
    ]
    .iter()
    .map(|line| line.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    let mock = server
        .mock("POST", "/api/pull")
        .match_body(Matcher::PartialJson(json!({"model": "llama2", "stream": true})))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let provider = provider_for(&server);
    let progress = RecordingProgress::default();
    let model = ModelInfo::new("llama2", ModelSource::OllamaLocal);

    assert!(provider.install_model(&model, Some(&progress)).await);
    mock.assert_async().await;

    let updates = progress.updates.lock().unwrap().clone();
    assert_eq!(updates, vec![(40, 100), (90, 150), (150, 150)]);
}

#[tokio::test]
async fn test_install_fails_on_error_line() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/pull")
        .with_status(200)
        .with_body("{\"status\":\"pulling manifest\"}\n{\"error\":\"pull model manifest: file does not exist\"}\n")
        .create_async()
        .await;

    let provider = provider_for(&server);
    let model = ModelInfo::new("no-such-model", ModelSource::OllamaLocal);
    assert!(!provider.install_model(&model, None).await);
}

#[tokio::test]
async fn test_install_succeeds_when_stream_ends_cleanly() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/pull")
        .with_status(200)
        .with_body("{\"status\":\"verifying sha256 digest\"}\n")
        .create_async()
        .await;

    let provider = provider_for(&server);
    let model = ModelInfo::new("phi", ModelSource::OllamaLocal);
    assert!(provider.install_model(&model, None).await);
}

#[tokio::test]
async fn test_uninstall() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/api/delete")
        .match_body(Matcher::Json(json!({"model": "llama2"})))
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("DELETE", "/api/delete")
        .match_body(Matcher::Json(json!({"model": "ghost"})))
        .with_status(404)
        .with_body(r#"{"error":"model 'ghost' not found"}"#)
        .create_async()
        .await;

    let provider = provider_for(&server);
    assert!(provider.uninstall_model("llama2").await);
    assert!(!provider.uninstall_model("ghost").await);
}
