//! Download progress reporting

use std::sync::Mutex;
use std::time::Instant;

use tracing::info;

/// Receives cumulative byte counts while a model downloads
///
/// Implementations are shared across await points, so `update` takes `&self`
/// and any state lives behind interior mutability.
pub trait DownloadProgress: Send + Sync {
    fn update(&self, bytes_downloaded: u64, total_bytes: u64);
}

#[derive(Debug)]
struct ProgressState {
    started: Instant,
    last_step: u64,
}

/// Logs a line every 5% with the observed transfer rate
#[derive(Debug)]
pub struct LoggingProgress {
    label: String,
    state: Mutex<ProgressState>,
}

impl LoggingProgress {
    const STEP_PERCENT: u64 = 5;

    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(ProgressState {
                started: Instant::now(),
                last_step: 0,
            }),
        }
    }
}

impl DownloadProgress for LoggingProgress {
    fn update(&self, bytes_downloaded: u64, total_bytes: u64) {
        if total_bytes == 0 {
            return;
        }
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        let percent = (bytes_downloaded.min(total_bytes) * 100) / total_bytes;
        let step = percent / Self::STEP_PERCENT;
        if step <= state.last_step {
            return;
        }
        state.last_step = step;

        let elapsed = state.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            bytes_downloaded as f64 / (1024.0 * 1024.0) / elapsed
        } else {
            0.0
        };
        info!(
            "{}: {}% ({} / {} bytes, {:.2} MB/s)",
            self.label, percent, bytes_downloaded, total_bytes, rate
        );
    }
}
