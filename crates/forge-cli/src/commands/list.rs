// List locally installed models

use super::{Command, CommandContext};
use crate::error::CliResult;
use crate::output::{print_info, OutputStyle};

pub struct ListCommand {
    context: CommandContext,
}

impl ListCommand {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl Command for ListCommand {
    async fn execute(&self) -> CliResult<()> {
        let tags = self.context.client()?.list_models().await?;
        if tags.models.is_empty() {
            print_info("No models installed. Pull one with 'ollama-forge pull <MODEL>'.");
            return Ok(());
        }

        let style = OutputStyle::default();
        println!("{}", style.tag_table(&tags.models));
        Ok(())
    }
}
