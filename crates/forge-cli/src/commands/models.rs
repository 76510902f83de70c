// Search and manage models across sources

use forge_models::{ModelError, ModelInfo, ModelManager, ModelSource};
use tracing::warn;

use super::{Command, CommandContext};
use crate::error::{CliError, CliResult};
use crate::output::{print_error, print_info, print_success, OutputStyle};
use crate::progress::{create_spinner, BarProgress};

/// Models command action
#[derive(Debug, Clone, PartialEq)]
pub enum ModelsAction {
    /// Ranked search over the selected sources (all when `None`)
    Search {
        query: String,
        sources: Option<Vec<ModelSource>>,
        limit: usize,
    },
    Installed,
    Show {
        name: String,
        source: Option<ModelSource>,
    },
    Install {
        name: String,
        source: ModelSource,
    },
    Uninstall {
        name: String,
        source: Option<ModelSource>,
    },
    UpdateIndex,
}

/// Models command handler
///
/// Loads the installed-state snapshot before running and writes it back after
/// any action that refreshes it.
pub struct ModelsCommand {
    context: CommandContext,
    action: ModelsAction,
}

impl ModelsCommand {
    pub fn new(context: CommandContext, action: ModelsAction) -> Self {
        Self { context, action }
    }

    fn open_manager(&self) -> CliResult<ModelManager> {
        let mut manager = self.context.manager()?;
        let path = self.context.config().state_path();
        if let Err(e) = manager.load_state(&path) {
            warn!("Ignoring unreadable model state at {}: {}", path.display(), e);
        }
        Ok(manager)
    }

    fn persist(&self, manager: &ModelManager) {
        let path = self.context.config().state_path();
        if let Err(e) = manager.save_state(&path) {
            warn!("Could not save model state to {}: {}", path.display(), e);
        }
    }

    /// Run a search and return the ranked results
    pub async fn search(
        &self,
        query: &str,
        sources: Option<&[ModelSource]>,
        limit: usize,
    ) -> CliResult<Vec<ModelInfo>> {
        let mut manager = self.open_manager()?;
        let results = manager.search_models(query, sources, Some(limit)).await;
        self.persist(&manager);
        Ok(results)
    }

    /// Find a model in `source`, or in the first source that knows it
    pub async fn show(&self, name: &str, source: Option<ModelSource>) -> CliResult<ModelInfo> {
        let manager = self.open_manager()?;
        let sources = match source {
            Some(source) => vec![source],
            None => manager.sources(),
        };
        for source in sources {
            if let Some(model) = manager.get_model_details(name, source).await {
                return Ok(model);
            }
        }
        Err(ModelError::ModelNotFound(name.to_string()).into())
    }

    async fn list_installed(&self) -> CliResult<()> {
        let mut manager = self.open_manager()?;
        let models = manager.list_installed_models().await;
        self.persist(&manager);

        if models.is_empty() {
            print_info("No installed models found.");
            return Ok(());
        }

        let style = OutputStyle::default();
        for source in ModelSource::ALL {
            let group: Vec<&ModelInfo> = models.iter().filter(|m| m.source == source).collect();
            if group.is_empty() {
                continue;
            }
            println!("{}", style.section(source.label()));
            for (i, model) in group.into_iter().enumerate() {
                println!("{}", style.model_line(i + 1, model));
            }
        }
        Ok(())
    }

    async fn install(&self, name: &str, source: ModelSource) -> CliResult<()> {
        let mut manager = self.open_manager()?;
        let progress = BarProgress::new(&format!("Installing {}", name));
        let installed = manager.install_model(name, source, Some(&progress)).await;
        self.persist(&manager);

        if installed {
            progress.finish(&format!("Installed {}", name));
            print_success(&format!("Installed {} from {}", name, source));
            Ok(())
        } else {
            progress.abandon(&format!("Installation of {} failed", name));
            Err(CliError::OperationFailed(format!(
                "Failed to install {} from {}. Run with -v for details.",
                name, source
            )))
        }
    }

    async fn uninstall(&self, name: &str, source: Option<ModelSource>) -> CliResult<()> {
        let mut manager = self.open_manager()?;
        let removed = manager.uninstall_model(name, source).await;
        self.persist(&manager);

        if removed {
            print_success(&format!("Uninstalled {}", name));
            Ok(())
        } else {
            Err(CliError::OperationFailed(format!(
                "Failed to uninstall {}. Check 'ollama-forge models installed'.",
                name
            )))
        }
    }

    async fn update_index(&self) -> CliResult<()> {
        let manager = self.open_manager()?;
        let spinner = create_spinner("Updating model indices...");
        let updates = manager.update_model_indices().await;
        spinner.finish_and_clear();

        if updates.is_empty() {
            print_info("No source keeps a model index.");
            return Ok(());
        }

        let mut failures = 0;
        for update in &updates {
            match &update.result {
                Ok(count) => print_success(&format!(
                    "{}: indexed {} models",
                    update.source.label(),
                    count
                )),
                Err(e) => {
                    failures += 1;
                    print_error(&format!("{}: {}", update.source.label(), e));
                }
            }
        }

        if failures == updates.len() {
            return Err(CliError::OperationFailed(
                "No model index could be updated".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Command for ModelsCommand {
    async fn execute(&self) -> CliResult<()> {
        let style = OutputStyle::default();
        match &self.action {
            ModelsAction::Search {
                query,
                sources,
                limit,
            } => {
                let results = self.search(query, sources.as_deref(), *limit).await?;
                if results.is_empty() {
                    print_info(&format!("No models found matching '{}'", query));
                    return Ok(());
                }
                println!("{}", style.section(&format!("Results for '{}'", query)));
                for (i, model) in results.iter().enumerate() {
                    println!("{}", style.model_line(i + 1, model));
                }
                Ok(())
            }
            ModelsAction::Installed => self.list_installed().await,
            ModelsAction::Show { name, source } => {
                let model = self.show(name, *source).await?;
                println!("{}", style.model_details(&model));
                Ok(())
            }
            ModelsAction::Install { name, source } => self.install(name, *source).await,
            ModelsAction::Uninstall { name, source } => self.uninstall(name, *source).await,
            ModelsAction::UpdateIndex => self.update_index().await,
        }
    }
}
