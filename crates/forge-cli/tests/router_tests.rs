//! Router and command parsing tests
//!
//! Tests for CLI command parsing using clap.

use clap::Parser;
use forge_cli::router::{Cli, Commands, ModelsSubcommand, SourceFilter, DEFAULT_SYSTEM_PROMPT};
use forge_models::ModelSource;

#[test]
fn test_parse_generate_defaults() {
    let cli = Cli::parse_from(["ollama-forge", "generate", "Why is the sky blue?"]);
    match cli.command {
        Commands::Generate {
            prompt,
            model,
            temperature,
            system,
            stream,
            no_fallback,
        } => {
            assert_eq!(prompt, "Why is the sky blue?");
            assert_eq!(model, None);
            assert_eq!(temperature, 0.7);
            assert_eq!(system, None);
            assert!(!stream);
            assert!(!no_fallback);
        }
        other => panic!("Expected Generate command, got {:?}", other),
    }
}

#[test]
fn test_parse_generate_with_options() {
    let cli = Cli::parse_from([
        "ollama-forge",
        "generate",
        "hello",
        "--model",
        "llama2",
        "--temperature",
        "0.2",
        "--stream",
        "--no-fallback",
    ]);
    if let Commands::Generate {
        model,
        temperature,
        stream,
        no_fallback,
        ..
    } = cli.command
    {
        assert_eq!(model.as_deref(), Some("llama2"));
        assert_eq!(temperature, 0.2);
        assert!(stream);
        assert!(no_fallback);
    } else {
        panic!("Expected Generate command");
    }
}

#[test]
fn test_parse_chat_uses_default_system_prompt() {
    let cli = Cli::parse_from(["ollama-forge", "chat", "Hello world"]);
    if let Commands::Chat {
        message, system, ..
    } = cli.command
    {
        assert_eq!(message, "Hello world");
        assert_eq!(system, DEFAULT_SYSTEM_PROMPT);
    } else {
        panic!("Expected Chat command");
    }
}

#[test]
fn test_parse_simple_commands() {
    for (arg, expected) in [
        ("list", Commands::List),
        ("version", Commands::Version),
        ("health", Commands::Health),
    ] {
        let cli = Cli::parse_from(["ollama-forge", arg]);
        assert_eq!(
            std::mem::discriminant(&cli.command),
            std::mem::discriminant(&expected)
        );
    }
    let cli = Cli::parse_from(["ollama-forge", "chat-session", "--model", "phi"]);
    assert!(matches!(cli.command, Commands::ChatSession { model: Some(ref m), .. } if m == "phi"));
    let cli = Cli::parse_from(["ollama-forge", "pull", "llama2:13b"]);
    assert!(matches!(cli.command, Commands::Pull { ref model } if model == "llama2:13b"));
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::parse_from([
        "ollama-forge",
        "list",
        "--api-url",
        "http://gpu-box:11434",
        "-v",
        "--config",
        "forge.yaml",
    ]);
    assert_eq!(cli.api_url.as_deref(), Some("http://gpu-box:11434"));
    assert!(cli.verbose);
    assert!(!cli.quiet);
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("forge.yaml")));
}

#[test]
fn test_verbose_and_quiet_conflict() {
    assert!(Cli::try_parse_from(["ollama-forge", "-v", "-q", "list"]).is_err());
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["ollama-forge"]).is_err());
}

#[test]
fn test_parse_models_search_defaults() {
    let cli = Cli::parse_from(["ollama-forge", "models", "search", "llama"]);
    match cli.command {
        Commands::Models {
            action: ModelsSubcommand::Search {
                query,
                source,
                limit,
            },
        } => {
            assert_eq!(query, "llama");
            assert_eq!(source, SourceFilter::All);
            assert_eq!(source.sources(), None);
            assert_eq!(limit, 20);
        }
        other => panic!("Expected models search, got {:?}", other),
    }
}

#[test]
fn test_parse_models_search_with_source() {
    let cli = Cli::parse_from([
        "ollama-forge",
        "models",
        "search",
        "mistral",
        "--source",
        "huggingface",
        "--limit",
        "5",
    ]);
    if let Commands::Models {
        action: ModelsSubcommand::Search { source, limit, .. },
    } = cli.command
    {
        assert_eq!(source, SourceFilter::Only(ModelSource::HuggingFace));
        assert_eq!(source.sources(), Some(vec![ModelSource::HuggingFace]));
        assert_eq!(limit, 5);
    } else {
        panic!("Expected models search");
    }
}

#[test]
fn test_parse_models_rejects_unknown_source() {
    let result = Cli::try_parse_from([
        "ollama-forge",
        "models",
        "search",
        "llama",
        "--source",
        "pypi",
    ]);
    let err = result.unwrap_err().to_string();
    assert!(err.contains("unknown source 'pypi'"));
}

#[test]
fn test_parse_models_install_defaults_to_local() {
    let cli = Cli::parse_from(["ollama-forge", "models", "install", "llama2"]);
    if let Commands::Models {
        action: ModelsSubcommand::Install { name, source },
    } = cli.command
    {
        assert_eq!(name, "llama2");
        assert_eq!(source, ModelSource::OllamaLocal);
    } else {
        panic!("Expected models install");
    }
}

#[test]
fn test_parse_models_uninstall_and_show() {
    let cli = Cli::parse_from(["ollama-forge", "models", "uninstall", "llama2"]);
    assert!(matches!(
        cli.command,
        Commands::Models {
            action: ModelsSubcommand::Uninstall { source: None, .. }
        }
    ));

    let cli = Cli::parse_from([
        "ollama-forge",
        "models",
        "show",
        "TheBloke/Llama-2-7B-GGUF",
        "-s",
        "hf",
    ]);
    assert!(matches!(
        cli.command,
        Commands::Models {
            action: ModelsSubcommand::Show {
                source: Some(ModelSource::HuggingFace),
                ..
            }
        }
    ));

    let cli = Cli::parse_from(["ollama-forge", "models", "update-index"]);
    assert!(matches!(
        cli.command,
        Commands::Models {
            action: ModelsSubcommand::UpdateIndex
        }
    ));
}
