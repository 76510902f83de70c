// CLI error types and exit codes

use forge_client::ClientError;
use forge_models::ModelError;
use thiserror::Error;

/// Process exit code for a successful run
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit code for any failed command
pub const EXIT_FAILURE: i32 = 1;

/// Process exit code after Ctrl-C (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ollama error: {0}")]
    Ollama(#[from] ClientError),

    #[error("Model management error: {0}")]
    Models(#[from] ModelError),

    #[error("{0}")]
    OperationFailed(String),

    #[error("Interrupted")]
    Interrupted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'ollama-forge --help' for usage information.",
                    message
                )
            }
            CliError::Io(e) => format!("File operation failed: {}", e),
            CliError::Config(msg) => {
                format!(
                    "Configuration error: {}\n\nCheck .ollama-forge/config.yaml and OLLAMA_FORGE_* environment variables.",
                    msg
                )
            }
            CliError::Ollama(e) => Self::ollama_message(e),
            CliError::Models(ModelError::OllamaApi(e)) => Self::ollama_message(e),
            CliError::Models(ModelError::Indexing(msg)) => format!("Index error: {}", msg),
            CliError::Models(e) => format!("{}", e),
            CliError::OperationFailed(msg) => msg.clone(),
            CliError::Interrupted => "Interrupted".to_string(),
            CliError::Internal(msg) => {
                format!("Internal error: {}\n\nPlease report this issue.", msg)
            }
        }
    }

    fn ollama_message(err: &ClientError) -> String {
        match err {
            ClientError::Connection(_) | ClientError::Timeout(_) => format!(
                "Could not reach the Ollama server: {}\n\nIs 'ollama serve' running? Check with 'ollama-forge health'.",
                err
            ),
            ClientError::ModelNotFound(name) => format!(
                "Model not found: {}\n\nPull it first with 'ollama-forge pull <MODEL>'.",
                name
            ),
            _ => format!("Ollama error: {}", err),
        }
    }

    /// Get technical details for verbose mode
    pub fn technical_details(&self) -> String {
        format!("{:?}", self)
    }

    /// Exit code the binary reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Interrupted => EXIT_INTERRUPTED,
            _ => EXIT_FAILURE,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Exit code for the outcome of a whole command
pub fn exit_code_for<T>(result: &CliResult<T>) -> i32 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(e) => e.exit_code(),
    }
}
