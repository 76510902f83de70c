// Command routing and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use forge_client::ForgeConfig;
use forge_models::ModelSource;
use tracing::debug;

use crate::commands::{
    ChatCommand, ChatSessionCommand, Command, CommandContext, DeleteCommand, EmbedCommand,
    GenerateCommand, HealthCommand, ListCommand, ModelsAction, ModelsCommand, PullCommand,
    VersionCommand,
};
use crate::error::{CliError, CliResult};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Which sources a search covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    All,
    Only(ModelSource),
}

impl SourceFilter {
    pub fn sources(&self) -> Option<Vec<ModelSource>> {
        match self {
            SourceFilter::All => None,
            SourceFilter::Only(source) => Some(vec![*source]),
        }
    }
}

fn parse_source_filter(value: &str) -> Result<SourceFilter, String> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(SourceFilter::All);
    }
    parse_source(value).map(SourceFilter::Only)
}

fn parse_source(value: &str) -> Result<ModelSource, String> {
    value.parse::<ModelSource>().map_err(|_| {
        format!(
            "unknown source '{}' (expected one of: {})",
            value,
            ModelSource::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

#[derive(Parser, Debug)]
#[command(name = "ollama-forge")]
#[command(about = "Talk to a local Ollama server and manage models from several sources")]
#[command(version)]
pub struct Cli {
    /// Ollama API URL (overrides configuration)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Extra configuration file applied after the global and project files
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate a completion for a prompt
    #[command(about = "Generate text from a prompt")]
    Generate {
        /// Prompt text
        prompt: String,

        /// Model to use (defaults to the configured chat model)
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature
        #[arg(short, long, default_value_t = 0.7)]
        temperature: f32,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,

        /// Print tokens as they arrive
        #[arg(long)]
        stream: bool,

        /// Do not retry with the backup model
        #[arg(long)]
        no_fallback: bool,
    },

    /// Send a single chat message
    #[command(about = "Send one chat message and print the reply")]
    Chat {
        /// Message text
        message: String,

        /// Model to use (defaults to the configured chat model)
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt
        #[arg(short, long, default_value = DEFAULT_SYSTEM_PROMPT)]
        system: String,

        /// Do not retry with the backup model
        #[arg(long)]
        no_fallback: bool,
    },

    /// Start an interactive chat session
    #[command(about = "Interactive chat session (type 'exit' or 'quit' to leave)")]
    ChatSession {
        /// Model to use (defaults to the configured chat model)
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt
        #[arg(short, long, default_value = DEFAULT_SYSTEM_PROMPT)]
        system: String,
    },

    /// Create an embedding for text
    #[command(about = "Embed text and print the vector dimension and a preview")]
    Embed {
        /// Text to embed
        text: String,

        /// Model to use (defaults to the configured embedding model)
        #[arg(short, long)]
        model: Option<String>,

        /// Do not retry with the backup model
        #[arg(long)]
        no_fallback: bool,
    },

    /// List locally installed models
    #[command(about = "List models installed in the local Ollama server")]
    List,

    /// Pull a model into the local server
    #[command(about = "Pull a model with a progress bar")]
    Pull {
        /// Model name, e.g. llama2 or llama2:13b
        model: String,
    },

    /// Delete a local model
    #[command(about = "Delete a model from the local Ollama server")]
    Delete {
        /// Model name
        model: String,
    },

    /// Show client and server version
    #[command(about = "Show client and server versions and check compatibility")]
    Version,

    /// Check that the server is reachable
    #[command(about = "Check whether the Ollama server is reachable")]
    Health,

    /// Search and manage models across sources
    #[command(about = "Search, inspect, install and uninstall models across sources")]
    Models {
        #[command(subcommand)]
        action: ModelsSubcommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelsSubcommand {
    /// Search every source, or one
    Search {
        /// Search terms
        query: String,

        /// all, ollama-local, ollama-remote or huggingface
        #[arg(short, long, default_value = "all", value_parser = parse_source_filter)]
        source: SourceFilter,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// List installed models from every source
    Installed,

    /// Show details for one model
    Show {
        /// Model name
        name: String,

        /// Source to look in (first match across sources when omitted)
        #[arg(short, long, value_parser = parse_source)]
        source: Option<ModelSource>,
    },

    /// Install a model
    Install {
        /// Model name
        name: String,

        /// Source to install from
        #[arg(short, long, default_value = "ollama-local", value_parser = parse_source)]
        source: ModelSource,
    },

    /// Uninstall a model
    Uninstall {
        /// Model name
        name: String,

        /// Source the model was installed from (first installed source when omitted)
        #[arg(short, long, value_parser = parse_source)]
        source: Option<ModelSource>,
    },

    /// Rebuild the remote model index
    UpdateIndex,
}

/// Route and execute commands
pub struct CommandRouter;

impl CommandRouter {
    /// Parse CLI arguments and route to appropriate handler
    pub async fn route() -> CliResult<()> {
        let cli = Cli::parse();

        crate::logging::init_logging(cli.verbose, cli.quiet);

        Self::execute(&cli).await
    }

    /// Load configuration honouring `--config` and `--api-url`
    pub fn load_config(cli: &Cli) -> CliResult<ForgeConfig> {
        let mut config = ForgeConfig::load(cli.config.as_deref())
            .map_err(|e| CliError::Config(e.to_string()))?;

        if let Some(api_url) = &cli.api_url {
            debug!("Using API URL from command line: {}", api_url);
            config.api_url = api_url.clone();
            config
                .validate()
                .map_err(|e| CliError::Config(e.to_string()))?;
        }

        Ok(config)
    }

    /// Execute a command
    pub async fn execute(cli: &Cli) -> CliResult<()> {
        let context = CommandContext::new(Self::load_config(cli)?);
        Self::dispatch(&cli.command, context).await
    }

    /// Run `command` against an already loaded context
    pub async fn dispatch(command: &Commands, context: CommandContext) -> CliResult<()> {
        match command {
            Commands::Generate {
                prompt,
                model,
                temperature,
                system,
                stream,
                no_fallback,
            } => {
                let cmd = GenerateCommand::new(context, prompt.clone())
                    .with_model(model.clone())
                    .with_temperature(*temperature)
                    .with_system(system.clone())
                    .with_stream(*stream)
                    .with_fallback(!*no_fallback);
                cmd.execute().await
            }
            Commands::Chat {
                message,
                model,
                system,
                no_fallback,
            } => {
                let cmd = ChatCommand::new(context, message.clone(), system.clone())
                    .with_model(model.clone())
                    .with_fallback(!*no_fallback);
                cmd.execute().await
            }
            Commands::ChatSession { model, system } => {
                let cmd = ChatSessionCommand::new(context, system.clone()).with_model(model.clone());
                cmd.execute().await
            }
            Commands::Embed {
                text,
                model,
                no_fallback,
            } => {
                let cmd = EmbedCommand::new(context, text.clone())
                    .with_model(model.clone())
                    .with_fallback(!*no_fallback);
                cmd.execute().await
            }
            Commands::List => ListCommand::new(context).execute().await,
            Commands::Pull { model } => PullCommand::new(context, model.clone()).execute().await,
            Commands::Delete { model } => {
                DeleteCommand::new(context, model.clone()).execute().await
            }
            Commands::Version => VersionCommand::new(context).execute().await,
            Commands::Health => HealthCommand::new(context).execute().await,
            Commands::Models { action } => {
                let action = match action {
                    ModelsSubcommand::Search {
                        query,
                        source,
                        limit,
                    } => ModelsAction::Search {
                        query: query.clone(),
                        sources: source.sources(),
                        limit: *limit,
                    },
                    ModelsSubcommand::Installed => ModelsAction::Installed,
                    ModelsSubcommand::Show { name, source } => ModelsAction::Show {
                        name: name.clone(),
                        source: *source,
                    },
                    ModelsSubcommand::Install { name, source } => ModelsAction::Install {
                        name: name.clone(),
                        source: *source,
                    },
                    ModelsSubcommand::Uninstall { name, source } => ModelsAction::Uninstall {
                        name: name.clone(),
                        source: *source,
                    },
                    ModelsSubcommand::UpdateIndex => ModelsAction::UpdateIndex,
                };
                ModelsCommand::new(context, action).execute().await
            }
        }
    }
}
