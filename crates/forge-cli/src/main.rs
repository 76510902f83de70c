// Ollama Forge CLI Entry Point

use forge_cli::{
    error::{exit_code_for, CliError},
    logging::VerbosityLevel,
    output::{self, OutputStyle},
    router::CommandRouter,
};

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() {
    let result = tokio::select! {
        result = CommandRouter::route() => result,
        _ = interrupted() => Err(CliError::Interrupted),
    };

    match &result {
        Err(CliError::Interrupted) => eprintln!("\nInterrupted"),
        Err(e) if VerbosityLevel::Verbose.should_output() => {
            let style = OutputStyle::default();
            eprintln!("{}", style.error_verbose(&e.user_message(), &e.technical_details()));
        }
        Err(e) => output::print_error(&e.user_message()),
        Ok(()) => {}
    }

    std::process::exit(exit_code_for(&result));
}
