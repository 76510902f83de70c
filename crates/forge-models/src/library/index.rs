//! On-disk persistence of the scraped library

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::LibraryModel;
use crate::{error::ModelError, Result};

#[derive(Serialize)]
struct BasicEntry<'a> {
    name: &'a str,
    description: &'a str,
    url: &'a str,
    tags: &'a [String],
}

pub struct LibraryIndex;

impl LibraryIndex {
    /// `models.json` → `models_detailed.json`
    pub fn detailed_path(path: &Path) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        path.with_file_name(format!("{}_detailed.json", stem))
    }

    /// Write the basic index to `path` and the detailed one beside it
    pub fn save(models: &[LibraryModel], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let basic: Vec<BasicEntry<'_>> = models
            .iter()
            .map(|m| BasicEntry {
                name: &m.name,
                description: &m.description,
                url: &m.url,
                tags: &m.tags,
            })
            .collect();
        fs::write(path, serde_json::to_string_pretty(&basic)?)?;

        let detailed_path = Self::detailed_path(path);
        fs::write(&detailed_path, serde_json::to_string_pretty(models)?)?;

        info!(
            "Saved library index with {} models to {}",
            models.len(),
            path.display()
        );
        Ok(())
    }

    /// Load the detailed index if present, else the basic one
    pub fn load(path: &Path) -> Result<Vec<LibraryModel>> {
        let detailed_path = Self::detailed_path(path);
        let source = if detailed_path.exists() {
            detailed_path
        } else if path.exists() {
            path.to_path_buf()
        } else {
            return Err(ModelError::Indexing(format!(
                "No model index found at {}. Run `ollama-forge models update-index` first.",
                path.display()
            )));
        };

        debug!("Loading library index from {}", source.display());
        let content = fs::read_to_string(&source)?;
        serde_json::from_str(&content).map_err(|e| {
            ModelError::Indexing(format!(
                "Failed to parse model index {}: {}",
                source.display(),
                e
            ))
        })
    }
}
