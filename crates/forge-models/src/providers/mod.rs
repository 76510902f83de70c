//! Concrete model sources

pub mod huggingface;
pub mod ollama_local;
pub mod ollama_remote;

use std::collections::HashMap;

use forge_client::OllamaClient;
use futures::StreamExt;
use tracing::{error, info};

use crate::progress::DownloadProgress;

pub use huggingface::{HuggingFaceModelProvider, SortKey};
pub use ollama_local::{format_size, OllamaLocalModelProvider};
pub use ollama_remote::OllamaRemoteModelProvider;

/// Pull `name` through Ollama, reporting bytes summed across layers
///
/// Succeeds on a `success` status or when the stream ends cleanly.
pub(crate) async fn pull_with_progress(
    client: &OllamaClient,
    name: &str,
    progress: Option<&dyn DownloadProgress>,
) -> bool {
    let mut stream = match client.pull_stream(name).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to start pull of {}: {}", name, e);
            return false;
        }
    };

    let mut layers: HashMap<String, (u64, u64)> = HashMap::new();
    while let Some(update) = stream.next().await {
        let update = match update {
            Ok(update) => update,
            Err(e) => {
                error!("Pull of {} failed: {}", name, e);
                return false;
            }
        };

        if update.total > 0 {
            layers.insert(update.digest.clone(), (update.completed, update.total));
            if let Some(progress) = progress {
                let (done, total) = layers
                    .values()
                    .fold((0, 0), |(d, t), (c, n)| (d + c, t + n));
                progress.update(done, total);
            }
        }

        if update.is_success() {
            info!("Successfully pulled model: {}", name);
            return true;
        }
    }

    info!("Pull stream for {} finished", name);
    true
}
