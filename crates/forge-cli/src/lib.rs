// Ollama Forge CLI Library

pub mod chat;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod router;

pub use error::{exit_code_for, CliError, CliResult};
pub use logging::{init_logging, VerbosityLevel};
pub use router::{Cli, CommandRouter, Commands};
