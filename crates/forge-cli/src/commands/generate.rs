// Generate a completion for a single prompt

use std::io::Write;

use forge_client::GenerateRequest;
use futures::StreamExt;
use tracing::debug;

use super::{Command, CommandContext};
use crate::error::CliResult;
use crate::logging;

/// Generate text from a prompt
pub struct GenerateCommand {
    context: CommandContext,
    prompt: String,
    model: Option<String>,
    temperature: f32,
    system: Option<String>,
    stream: bool,
    fallback: bool,
}

impl GenerateCommand {
    pub fn new(context: CommandContext, prompt: String) -> Self {
        Self {
            context,
            prompt,
            model: None,
            temperature: 0.7,
            system: None,
            stream: false,
            fallback: true,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// The request sent for the first candidate
    pub fn request(&self, model: &str) -> GenerateRequest {
        let request =
            GenerateRequest::new(model, self.prompt.clone()).with_temperature(self.temperature);
        match &self.system {
            Some(system) => request.with_system(system.clone()),
            None => request,
        }
    }

    /// Run the generation and return the model used with the full text
    pub async fn generate(&self) -> CliResult<(String, String)> {
        let client = self.context.client()?;
        let candidates = self
            .context
            .chat_candidates(self.model.as_deref(), self.fallback);
        let request = self.request(candidates.primary());

        if !self.stream {
            let (model, response) = client.generate_with_fallback(&candidates, &request).await?;
            return Ok((model, response.response));
        }

        let client = &client;
        let (model, mut stream) = candidates
            .run(|model| {
                let mut request = request.clone();
                request.model = model;
                async move { client.generate_stream(&request).await }
            })
            .await?;

        let mut text = String::new();
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            print!("{}", chunk.response);
            stdout.flush()?;
            text.push_str(&chunk.response);
            if chunk.done {
                break;
            }
        }
        println!();
        Ok((model, text))
    }
}

#[async_trait::async_trait]
impl Command for GenerateCommand {
    async fn execute(&self) -> CliResult<()> {
        let primary = self
            .model
            .clone()
            .unwrap_or_else(|| self.context.config().chat_model.clone());
        debug!("Generating with primary model {}", primary);

        let (model, text) = self.generate().await?;
        if !self.stream {
            println!("{}", text);
        }
        if model != primary {
            logging::info(&format!("Answered by fallback model {}", model));
        }
        Ok(())
    }
}
