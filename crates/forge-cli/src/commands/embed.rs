// Create an embedding for text

use forge_client::EmbedRequest;

use super::{Command, CommandContext};
use crate::error::{CliError, CliResult};
use crate::output::OutputStyle;

/// Number of leading vector components shown
const PREVIEW_LEN: usize = 5;

pub struct EmbedCommand {
    context: CommandContext,
    text: String,
    model: Option<String>,
    fallback: bool,
}

impl EmbedCommand {
    pub fn new(context: CommandContext, text: String) -> Self {
        Self {
            context,
            text,
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

    /// Embed the text and return the model used with the vector
    pub async fn embedding(&self) -> CliResult<(String, Vec<f64>)> {
        let client = self.context.client()?;
        let candidates = self
            .context
            .embedding_candidates(self.model.as_deref(), self.fallback);
        let request = EmbedRequest::new(candidates.primary(), self.text.clone());

        let (model, response) = client.embed_with_fallback(&candidates, &request).await?;
        let vector = response.first().map(<[f64]>::to_vec).ok_or_else(|| {
            CliError::OperationFailed(format!("Model {} returned no embedding", model))
        })?;
        Ok((model, vector))
    }
}

/// `[0.1234, -0.5678, ...]` style preview of the first few components
pub fn preview(vector: &[f64]) -> String {
    let shown: Vec<String> = vector
        .iter()
        .take(PREVIEW_LEN)
        .map(|v| format!("{:.4}", v))
        .collect();
    let ellipsis = if vector.len() > PREVIEW_LEN { ", ..." } else { "" };
    format!("[{}{}]", shown.join(", "), ellipsis)
}

#[async_trait::async_trait]
impl Command for EmbedCommand {
    async fn execute(&self) -> CliResult<()> {
        let style = OutputStyle::default();
        let (model, vector) = self.embedding().await?;
        println!("{}", style.key_value("Model", &model));
        println!("{}", style.key_value("Dimensions", &vector.len().to_string()));
        println!("{}", style.key_value("Preview", &preview(&vector)));
        Ok(())
    }
}
