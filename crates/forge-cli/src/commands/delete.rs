// Delete a local model

use super::{Command, CommandContext};
use crate::error::CliResult;
use crate::output::print_success;

pub struct DeleteCommand {
    context: CommandContext,
    model: String,
}

impl DeleteCommand {
    pub fn new(context: CommandContext, model: String) -> Self {
        Self { context, model }
    }
}

#[async_trait::async_trait]
impl Command for DeleteCommand {
    async fn execute(&self) -> CliResult<()> {
        self.context.client()?.delete(&self.model).await?;
        print_success(&format!("Deleted {}", self.model));
        Ok(())
    }
}
