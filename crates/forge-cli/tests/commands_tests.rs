//! Command handler tests against a mock Ollama server

use forge_cli::chat::ChatSession;
use forge_cli::commands::{
    ChatCommand, Command, CommandContext, EmbedCommand, GenerateCommand, HealthCommand,
    ModelsAction, ModelsCommand,
};
use forge_cli::error::CliError;
use forge_client::{ClientError, ForgeConfig, ModelCandidates, OllamaClient};
use forge_models::{ModelError, ModelSource};
use mockito::Matcher;
use serde_json::json;
use tempfile::TempDir;

fn context_for(server: &mockito::ServerGuard, cache: &TempDir) -> CommandContext {
    CommandContext::new(ForgeConfig {
        api_url: server.url(),
        max_retries: 0,
        chat_model: "primary".to_string(),
        backup_chat_model: "backup".to_string(),
        embedding_model: "embedder".to_string(),
        backup_embedding_model: "backup-embedder".to_string(),
        huggingface_api_url: server.url(),
        cache_dir: cache.path().to_path_buf(),
        ..ForgeConfig::default()
    })
}

async fn missing_model(server: &mut mockito::ServerGuard, path: &str, model: &str) {
    server
        .mock("POST", path)
        .match_body(Matcher::PartialJson(json!({ "model": model })))
        .with_status(404)
        .with_body(format!(r#"{{"error":"model '{}' not found"}}"#, model))
        .create_async()
        .await;
}

#[tokio::test]
async fn test_health_command() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/version")
        .with_status(200)
        .with_body(r#"{"version":"0.5.7"}"#)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    assert!(HealthCommand::new(context_for(&server, &cache))
        .execute()
        .await
        .is_ok());

    let down = CommandContext::new(ForgeConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        ..ForgeConfig::default()
    });
    match HealthCommand::new(down).execute().await {
        Err(CliError::OperationFailed(msg)) => assert!(msg.contains("not reachable")),
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_falls_back_to_backup_model() {
    let mut server = mockito::Server::new_async().await;
    missing_model(&mut server, "/api/generate", "primary").await;
    server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "model": "backup",
            "prompt": "hi",
            "options": {"temperature": 0.5}
        })))
        .with_status(200)
        .with_body(r#"{"model":"backup","response":"hello from backup","done":true}"#)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    let cmd = GenerateCommand::new(context_for(&server, &cache), "hi".to_string())
        .with_temperature(0.5);
    let (model, text) = cmd.generate().await.unwrap();
    assert_eq!(model, "backup");
    assert_eq!(text, "hello from backup");
}

#[tokio::test]
async fn test_generate_without_fallback_reports_missing_model() {
    let mut server = mockito::Server::new_async().await;
    missing_model(&mut server, "/api/generate", "primary").await;
    let backup = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"model": "backup"})))
        .expect(0)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    let cmd = GenerateCommand::new(context_for(&server, &cache), "hi".to_string())
        .with_fallback(false);
    match cmd.generate().await {
        Err(CliError::Ollama(ClientError::ModelNotFound(_))) => {}
        other => panic!("Expected ModelNotFound, got {:?}", other),
    }
    backup.assert_async().await;
}

#[tokio::test]
async fn test_generate_streams_chunks() {
    let mut server = mockito::Server::new_async().await;
    let body = [
        json!({"model": "primary", "response": "Hel", "done": false}),
        json!({"model": "primary", "response": "lo", "done": false}),
        json!({"model": "primary", "response": "", "done": true}),
    ]
    .iter()
    .map(|line| line.to_string())
    .collect::<Vec<_>>()
    .join("\n");
    server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({"model": "primary", "stream": true})))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    let cmd = GenerateCommand::new(context_for(&server, &cache), "hi".to_string())
        .with_stream(true);
    let (model, text) = cmd.generate().await.unwrap();
    assert_eq!(model, "primary");
    assert_eq!(text, "Hello");
}

#[tokio::test]
async fn test_chat_command_prefers_explicit_model() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "model": "mistral",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .with_status(200)
        .with_body(r#"{"model":"mistral","message":{"role":"assistant","content":"Hello."},"done":true}"#)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    let cmd = ChatCommand::new(
        context_for(&server, &cache),
        "Hi".to_string(),
        "Be brief.".to_string(),
    )
    .with_model(Some("mistral".to_string()));
    let (model, reply) = cmd.reply().await.unwrap();
    mock.assert_async().await;
    assert_eq!(model, "mistral");
    assert_eq!(reply, "Hello.");
}

#[tokio::test]
async fn test_chat_session_keeps_history() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .match_body(Matcher::Json(json!({
            "model": "primary",
            "messages": [
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "first"}
            ],
            "stream": false
        })))
        .with_status(200)
        .with_body(r#"{"message":{"role":"assistant","content":"one"},"done":true}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/chat")
        .match_body(Matcher::Json(json!({
            "model": "primary",
            "messages": [
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "one"},
                {"role": "user", "content": "second"}
            ],
            "stream": false
        })))
        .with_status(500)
        .with_body(r#"{"error":"out of memory"}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(server.url()).unwrap().with_max_retries(0);
    let mut session = ChatSession::new(client, ModelCandidates::single("primary"), "sys");

    assert_eq!(session.send("first").await.unwrap(), "one");
    assert_eq!(session.history().len(), 3);

    assert!(session.send("second").await.is_err());
    assert_eq!(session.history().len(), 3);

    session.clear();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].role, "system");
}

#[tokio::test]
async fn test_embed_command_uses_embedding_model() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/embed")
        .match_body(Matcher::PartialJson(json!({"model": "embedder", "input": ["some text"]})))
        .with_status(200)
        .with_body(r#"{"model":"embedder","embeddings":[[0.1,0.2,0.3]]}"#)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    let cmd = EmbedCommand::new(context_for(&server, &cache), "some text".to_string());
    let (model, vector) = cmd.embedding().await.unwrap();
    assert_eq!(model, "embedder");
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

const TAGS_BODY: &str = r#"{"models": [
    {"name": "llama2:latest", "size": 3826793677, "digest": "sha256:1",
     "details": {"family": "llama", "parameter_size": "7B", "quantization_level": "Q4_0"}},
    {"name": "phi:latest", "size": 1602463378, "digest": "sha256:2"}
]}"#;

#[tokio::test]
async fn test_models_search_and_show_local() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(TAGS_BODY)
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();
    let context = context_for(&server, &cache);
    let state_path = context.config().state_path();

    let cmd = ModelsCommand::new(context.clone(), ModelsAction::Installed);
    let results = cmd
        .search("llama", Some(&[ModelSource::OllamaLocal]), 20)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "llama2:latest");
    assert!(results[0].installed);

    // The refreshed installed state is written back
    assert!(state_path.exists());

    let model = cmd.show("llama2", Some(ModelSource::OllamaLocal)).await.unwrap();
    assert_eq!(model.parameters.as_deref(), Some("7B"));

    match cmd.show("ghost", Some(ModelSource::OllamaLocal)).await {
        Err(CliError::Models(ModelError::ModelNotFound(name))) => assert_eq!(name, "ghost"),
        other => panic!("Expected ModelNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_models_install_failure_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(r#"{"models": []}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/pull")
        .with_status(200)
        .with_body("{\"error\":\"pull model manifest: file does not exist\"}\n")
        .create_async()
        .await;
    let cache = TempDir::new().unwrap();

    let cmd = ModelsCommand::new(
        context_for(&server, &cache),
        ModelsAction::Install {
            name: "no-such-model".to_string(),
            source: ModelSource::OllamaLocal,
        },
    );
    match cmd.execute().await {
        Err(CliError::OperationFailed(msg)) => assert!(msg.contains("no-such-model")),
        other => panic!("Expected OperationFailed, got {:?}", other),
    }

    let remote = ModelsCommand::new(
        context_for(&server, &cache),
        ModelsAction::Install {
            name: "llama3".to_string(),
            source: ModelSource::OllamaRemote,
        },
    );
    assert!(remote.execute().await.is_err());
}
