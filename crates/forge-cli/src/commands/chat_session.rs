// Interactive chat session

use super::{Command, CommandContext};
use crate::chat::ChatSession;
use crate::error::CliResult;

pub struct ChatSessionCommand {
    context: CommandContext,
    system: String,
    model: Option<String>,
}

impl ChatSessionCommand {
    pub fn new(context: CommandContext, system: String) -> Self {
        Self {
            context,
            system,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait::async_trait]
impl Command for ChatSessionCommand {
    async fn execute(&self) -> CliResult<()> {
        let client = self.context.client()?;
        let candidates = self.context.chat_candidates(self.model.as_deref(), true);
        let mut session = ChatSession::new(client, candidates, self.system.clone());
        tokio::task::block_in_place(|| session.start())
    }
}
