// Send a single chat message

use forge_client::{ChatMessage, ChatRequest};

use super::{Command, CommandContext};
use crate::error::CliResult;
use crate::logging;

/// One-shot chat with a system prompt
pub struct ChatCommand {
    context: CommandContext,
    message: String,
    system: String,
    model: Option<String>,
    fallback: bool,
}

impl ChatCommand {
    pub fn new(context: CommandContext, message: String, system: String) -> Self {
        Self {
            context,
            message,
            system,
            model: None,
            fallback: true,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Send the message and return the model used with the reply
    pub async fn reply(&self) -> CliResult<(String, String)> {
        let client = self.context.client()?;
        let candidates = self
            .context
            .chat_candidates(self.model.as_deref(), self.fallback);
        let request = ChatRequest::new(
            candidates.primary(),
            vec![
                ChatMessage::system(self.system.clone()),
                ChatMessage::user(self.message.clone()),
            ],
        );

        let (model, response) = client.chat_with_fallback(&candidates, &request).await?;
        Ok((model, response.message.content))
    }
}

#[async_trait::async_trait]
impl Command for ChatCommand {
    async fn execute(&self) -> CliResult<()> {
        let primary = self
            .model
            .clone()
            .unwrap_or_else(|| self.context.config().chat_model.clone());
        let (model, reply) = self.reply().await?;
        println!("{}", reply);
        if model != primary {
            logging::info(&format!("Answered by fallback model {}", model));
        }
        Ok(())
    }
}
