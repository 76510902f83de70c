// Output formatting and styling

use colored::Colorize;
use forge_client::TagModel;
use forge_models::{providers::format_size, ModelInfo};

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl OutputStyle {
    /// Format success message
    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    /// Format error message
    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✗".red().bold(), msg)
        } else {
            format!("✗ {}", msg)
        }
    }

    /// Format warning message
    pub fn warning(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "⚠".yellow(), msg)
        } else {
            format!("⚠ {}", msg)
        }
    }

    /// Format info message
    pub fn info(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "ℹ".blue(), msg)
        } else {
            format!("ℹ {}", msg)
        }
    }

    /// Format prompt
    pub fn prompt(&self, prompt: &str) -> String {
        if self.use_colors {
            format!("{} ", prompt.magenta().bold())
        } else {
            format!("{} ", prompt)
        }
    }

    /// Format header
    pub fn header(&self, title: &str) -> String {
        if self.use_colors {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format verbose error with details
    pub fn error_verbose(&self, error: &str, details: &str) -> String {
        format!("{}\n{}", self.error(error), details)
    }

    /// Format a section header
    pub fn section(&self, title: &str) -> String {
        let rule = "─".repeat(title.chars().count());
        if self.use_colors {
            format!("\n{}\n{}", title.bold().underline(), rule)
        } else {
            format!("\n{}\n{}", title, rule)
        }
    }

    /// Format a key-value pair
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.use_colors {
            format!("  {}: {}", key.bold(), value)
        } else {
            format!("  {}: {}", key, value)
        }
    }

    /// One search-result line: position, name, source, and an installed marker
    pub fn model_line(&self, number: usize, model: &ModelInfo) -> String {
        let marker = if model.installed { " [installed]" } else { "" };
        let name = if self.use_colors {
            model.name.cyan().bold().to_string()
        } else {
            model.name.clone()
        };
        let mut line = format!("  {}. {} ({}){}", number, name, model.source, marker);

        let extras: Vec<String> = [
            model.parameters.clone(),
            model.size.as_ref().map(|s| s.to_string()),
            model.quantization.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !extras.is_empty() {
            line.push_str(&format!(" - {}", extras.join(", ")));
        }
        if !model.description.is_empty() {
            line.push_str(&format!("\n     {}", truncate(&model.description, 100)));
        }
        line
    }

    /// Every known field of a model, one per line
    pub fn model_details(&self, model: &ModelInfo) -> String {
        let mut lines = vec![
            self.header(&model.name),
            self.key_value("Source", model.source.as_str()),
            self.key_value("Installed", if model.installed { "yes" } else { "no" }),
        ];
        if !model.description.is_empty() {
            lines.push(self.key_value("Description", &model.description));
        }
        if let Some(parameters) = &model.parameters {
            lines.push(self.key_value("Parameters", parameters));
        }
        if let Some(size) = &model.size {
            lines.push(self.key_value("Size", &size.to_string()));
        }
        if let Some(quantization) = &model.quantization {
            lines.push(self.key_value("Quantization", quantization));
        }
        if let Some(context) = model.context_length {
            lines.push(self.key_value("Context length", &context.to_string()));
        }
        if let Some(url) = &model.url {
            lines.push(self.key_value("URL", url));
        }
        if !model.tags.is_empty() {
            lines.push(self.key_value("Tags", &model.tags.join(", ")));
        }
        for (key, value) in &model.metadata {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(self.key_value(key, &value));
        }
        lines.join("\n")
    }

    /// Aligned table of locally installed tags
    pub fn tag_table(&self, models: &[TagModel]) -> String {
        let name_width = models
            .iter()
            .map(|m| m.name.chars().count())
            .max()
            .unwrap_or(0)
            .max("NAME".len());

        let mut lines = vec![self.header(&format!(
            "{:<width$}  {:>8}  {:<10}  MODIFIED",
            "NAME",
            "SIZE",
            "PARAMS",
            width = name_width
        ))];
        for model in models {
            let params = model
                .details
                .as_ref()
                .and_then(|d| d.parameter_size.clone())
                .unwrap_or_else(|| "-".to_string());
            let modified = model
                .modified_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "{:<width$}  {:>8}  {:<10}  {}",
                model.name,
                format_size(model.size),
                params,
                modified,
                width = name_width
            ));
        }
        lines.join("\n")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// Print formatted output
pub fn print_success(msg: &str) {
    let style = OutputStyle::default();
    println!("{}", style.success(msg));
}

pub fn print_error(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.error(msg));
}

pub fn print_warning(msg: &str) {
    let style = OutputStyle::default();
    println!("{}", style.warning(msg));
}

pub fn print_info(msg: &str) {
    let style = OutputStyle::default();
    println!("{}", style.info(msg));
}
