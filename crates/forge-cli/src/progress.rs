// Progress indicators and spinners

use std::time::Duration;

use forge_models::DownloadProgress;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a spinner for long-running operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|e| {
            eprintln!("Failed to create spinner template: {}", e);
            ProgressStyle::default_spinner()
        });
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Create a byte-counting bar for downloads whose size arrives later
pub fn create_download_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
        .unwrap_or_else(|e| {
            eprintln!("Failed to create download bar template: {}", e);
            ProgressStyle::default_bar()
        })
        .progress_chars("=>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Drives a terminal progress bar from download updates
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(message: &str) -> Self {
        Self {
            bar: create_download_bar(message),
        }
    }

    /// Wrap an existing bar, e.g. a hidden one
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl DownloadProgress for BarProgress {
    fn update(&self, bytes_downloaded: u64, total_bytes: u64) {
        if self.bar.length() != Some(total_bytes) {
            self.bar.set_length(total_bytes);
        }
        self.bar.set_position(bytes_downloaded.min(total_bytes));
    }
}
