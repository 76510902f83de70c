// Display version information

use forge_client::{is_compatible_ollama_version, MINIMUM_OLLAMA_VERSION};

use super::{Command, CommandContext};
use crate::error::CliResult;
use crate::output::{print_warning, OutputStyle};

/// Display client and server version information
pub struct VersionCommand {
    context: CommandContext,
}

impl VersionCommand {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    /// Get client version information
    pub fn client_version() -> String {
        format!("ollama-forge v{}", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait::async_trait]
impl Command for VersionCommand {
    async fn execute(&self) -> CliResult<()> {
        let style = OutputStyle::default();
        println!("{}", style.header(&Self::client_version()));

        let server = self.context.client()?.version().await?;
        println!("{}", style.key_value("Ollama server", &server.version));

        if is_compatible_ollama_version(&server.version) {
            println!("{}", style.success("Server version is compatible"));
        } else {
            print_warning(&format!(
                "Server version {} is older than the minimum supported {}",
                server.version, MINIMUM_OLLAMA_VERSION
            ));
        }
        Ok(())
    }
}
