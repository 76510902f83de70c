// Pull a model into the local server

use forge_models::{ModelInfo, ModelInstaller, ModelSource, OllamaLocalModelProvider};

use super::{Command, CommandContext};
use crate::error::{CliError, CliResult};
use crate::output::print_success;
use crate::progress::BarProgress;

pub struct PullCommand {
    context: CommandContext,
    model: String,
}

impl PullCommand {
    pub fn new(context: CommandContext, model: String) -> Self {
        Self { context, model }
    }
}

#[async_trait::async_trait]
impl Command for PullCommand {
    async fn execute(&self) -> CliResult<()> {
        let provider = OllamaLocalModelProvider::new(self.context.client()?);
        let progress = BarProgress::new(&format!("Pulling {}", self.model));
        let model = ModelInfo::new(self.model.clone(), ModelSource::OllamaLocal);

        if provider.install_model(&model, Some(&progress)).await {
            progress.finish(&format!("Pulled {}", self.model));
            print_success(&format!("Model {} is ready", self.model));
            Ok(())
        } else {
            progress.abandon(&format!("Pull of {} failed", self.model));
            Err(CliError::OperationFailed(format!(
                "Failed to pull {}. Run with -v for details.",
                self.model
            )))
        }
    }
}
