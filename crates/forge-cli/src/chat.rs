// Interactive chat mode

use forge_client::{ChatMessage, ChatRequest, ModelCandidates, OllamaClient};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::output::OutputStyle;

/// What a line typed at the chat prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Exit,
    Clear,
    Empty,
    Message(String),
}

impl SessionInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "exit" | "quit" => SessionInput::Exit,
            "clear" => SessionInput::Clear,
            "" => SessionInput::Empty,
            _ => SessionInput::Message(trimmed.to_string()),
        }
    }
}

/// Chat session manager
///
/// The history always starts with the system prompt and grows by one user and
/// one assistant turn per successful exchange.
pub struct ChatSession {
    client: OllamaClient,
    candidates: ModelCandidates,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    /// Create a new chat session
    pub fn new(client: OllamaClient, candidates: ModelCandidates, system: impl Into<String>) -> Self {
        Self {
            client,
            candidates,
            history: vec![ChatMessage::system(system)],
        }
    }

    pub fn model(&self) -> &str {
        self.candidates.primary()
    }

    /// Get chat history
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Drop every turn except the system prompt
    pub fn clear(&mut self) {
        self.history.truncate(1);
    }

    /// Send `message` with the full history and record the reply
    ///
    /// A failed exchange leaves the history unchanged.
    pub async fn send(&mut self, message: &str) -> CliResult<String> {
        self.history.push(ChatMessage::user(message));
        let request = ChatRequest::new(self.candidates.primary(), self.history.clone());

        match self.client.chat_with_fallback(&self.candidates, &request).await {
            Ok((model, response)) => {
                debug!("Chat reply from {}", model);
                let reply = response.message.content;
                self.history.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e.into())
            }
        }
    }

    /// Start interactive chat mode
    ///
    /// Blocks the calling thread; must run inside a multi-threaded Tokio
    /// runtime, e.g. under `tokio::task::block_in_place`.
    pub fn start(&mut self) -> CliResult<()> {
        let runtime = tokio::runtime::Handle::current();
        let style = OutputStyle::default();
        let mut rl = DefaultEditor::new().map_err(|e| CliError::Internal(e.to_string()))?;

        println!("Entering chat mode. Type 'exit' or 'quit' to leave, 'clear' to reset.");
        println!("Model: {}", self.model());

        let prompt = style.prompt(">>>");
        loop {
            let readline = rl.readline(&prompt);
            match readline {
                Ok(line) => match SessionInput::parse(&line) {
                    SessionInput::Exit => {
                        println!("Goodbye!");
                        break;
                    }
                    SessionInput::Clear => {
                        self.clear();
                        println!("{}", style.info("History cleared"));
                    }
                    SessionInput::Empty => {}
                    SessionInput::Message(message) => {
                        let _ = rl.add_history_entry(message.as_str());
                        match runtime.block_on(self.send(&message)) {
                            Ok(reply) => println!("{}\n", reply),
                            Err(e) => eprintln!("{}", style.error(&e.user_message())),
                        }
                    }
                },
                Err(ReadlineError::Interrupted) => return Err(CliError::Interrupted),
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(e) => return Err(CliError::Internal(e.to_string())),
            }
        }

        Ok(())
    }
}
