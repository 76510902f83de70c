// Check whether the server is reachable

use super::{Command, CommandContext};
use crate::error::{CliError, CliResult};
use crate::output::print_success;

pub struct HealthCommand {
    context: CommandContext,
}

impl HealthCommand {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl Command for HealthCommand {
    async fn execute(&self) -> CliResult<()> {
        let client = self.context.client()?;
        if client.health_check().await {
            print_success(&format!("Ollama server is reachable at {}", client.base_url()));
            Ok(())
        } else {
            Err(CliError::OperationFailed(format!(
                "Ollama server is not reachable at {}",
                client.base_url()
            )))
        }
    }
}
