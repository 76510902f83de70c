//! Offline search over the scraped library

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::LibraryModel;
use crate::{error::ModelError, Result};

static PARAM_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*([bm])\b").expect("valid param count regex"));

/// Parameter counts in billions found in `text` (`"7B"` → 7, `"350M"` → 0.35)
pub fn parameter_billions(text: &str) -> Vec<f64> {
    PARAM_COUNT
        .captures_iter(text)
        .filter_map(|c| {
            let value = c.get(1)?.as_str().parse::<f64>().ok()?;
            let unit = c.get(2)?.as_str();
            Some(if unit.eq_ignore_ascii_case("m") {
                value / 1000.0
            } else {
                value
            })
        })
        .collect()
}

/// Parse a displayed context length (`"8k"` → 8000, `"4096"` → 4096)
pub fn parse_context_length(text: &str) -> Option<u64> {
    let text = text.trim().to_lowercase();
    match text.strip_suffix('k') {
        Some(thousands) => thousands
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|k| k.checked_mul(1000)),
        None => text.parse::<u64>().ok(),
    }
}

/// Structured filters understood by the library searcher
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryFilters {
    /// Billions of parameters
    pub min_params: Option<f64>,
    pub max_params: Option<f64>,
    /// Every tag must be present (case-insensitive)
    pub tags: Vec<String>,
    pub min_context: Option<u64>,
}

impl LibraryFilters {
    /// Build from string filters (`min_params=7B`, `tags=tools,vision`, ...)
    ///
    /// Unknown keys are ignored; malformed values are a validation error.
    pub fn from_map(filters: &BTreeMap<String, String>) -> Result<Self> {
        let mut parsed = Self::default();
        for (key, value) in filters {
            match key.as_str() {
                "min_params" => parsed.min_params = Some(parse_param_filter(key, value)?),
                "max_params" => parsed.max_params = Some(parse_param_filter(key, value)?),
                "min_context" => {
                    parsed.min_context = Some(parse_context_length(value).ok_or_else(|| {
                        ModelError::Validation(format!("Invalid min_context: {}", value))
                    })?)
                }
                "tags" => {
                    parsed.tags = value
                        .split(',')
                        .map(|t| t.trim().to_lowercase())
                        .filter(|t| !t.is_empty())
                        .collect()
                }
                _ => {}
            }
        }
        Ok(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn matches(&self, model: &LibraryModel) -> bool {
        if self.min_params.is_some() || self.max_params.is_some() {
            let text = model
                .metadata
                .parameters
                .as_deref()
                .or(model.metadata.size.as_deref())
                .unwrap_or_default();
            let sizes = parameter_billions(text);
            let in_range = sizes.iter().any(|&b| {
                self.min_params.map_or(true, |min| b >= min)
                    && self.max_params.map_or(true, |max| b <= max)
            });
            if !in_range {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let tags: Vec<String> = model.tags.iter().map(|t| t.to_lowercase()).collect();
            if !self.tags.iter().all(|required| tags.contains(required)) {
                return false;
            }
        }

        if let Some(min_context) = self.min_context {
            let context = model
                .metadata
                .context_length
                .as_deref()
                .and_then(parse_context_length);
            if context.map_or(true, |c| c < min_context) {
                return false;
            }
        }

        true
    }
}

fn parse_param_filter(key: &str, value: &str) -> Result<f64> {
    parameter_billions(value)
        .first()
        .copied()
        .or_else(|| value.trim().parse::<f64>().ok())
        .ok_or_else(|| ModelError::Validation(format!("Invalid {}: {}", key, value)))
}

/// Scores library entries against a free-text query
pub struct LibrarySearcher<'a> {
    models: &'a [LibraryModel],
}

impl<'a> LibrarySearcher<'a> {
    pub fn new(models: &'a [LibraryModel]) -> Self {
        Self { models }
    }

    /// Matching models with their scores, best first
    ///
    /// A blank query returns every model passing `filters` with score 0.
    pub fn search(&self, query: &str, filters: &LibraryFilters) -> Vec<(&'a LibraryModel, u32)> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();

        let mut results: Vec<(&'a LibraryModel, u32)> = self
            .models
            .iter()
            .filter(|m| filters.matches(m))
            .map(|m| (m, Self::score(m, &terms)))
            .filter(|(_, score)| terms.is_empty() || *score > 0)
            .collect();
        results.sort_by(|a, b| b.1.cmp(&a.1));
        results
    }

    fn score(model: &LibraryModel, terms: &[String]) -> u32 {
        let name = model.name.to_lowercase();
        let description = model.description.to_lowercase();
        let metadata = model.metadata.search_text();

        let mut score = 0;
        for term in terms {
            let term = term.as_str();
            if name.contains(term) {
                score += 5;
                if name.starts_with(term) {
                    score += 3;
                }
                if name == term {
                    score += 5;
                }
            }
            for tag in &model.tags {
                let tag = tag.to_lowercase();
                if tag.contains(term) {
                    score += 4;
                    if tag == term {
                        score += 2;
                    }
                }
            }
            if metadata.contains(term) {
                score += 3;
            }
            if description.contains(term) {
                score += 2;
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_billions() {
        assert_eq!(parameter_billions("7B"), vec![7.0]);
        assert_eq!(parameter_billions("1B, 3B"), vec![1.0, 3.0]);
        assert_eq!(parameter_billions("350M"), vec![0.35]);
        assert!(parameter_billions("unknown").is_empty());
    }

    #[test]
    fn test_parse_context_length() {
        assert_eq!(parse_context_length("8k"), Some(8000));
        assert_eq!(parse_context_length("128K"), Some(128_000));
        assert_eq!(parse_context_length("4096"), Some(4096));
        assert_eq!(parse_context_length("long"), None);
        assert_eq!(parse_context_length("99999999999999999k"), None);
    }

    #[test]
    fn test_filters_from_map() {
        let mut map = BTreeMap::new();
        map.insert("min_params".to_string(), "500M".to_string());
        map.insert("max_params".to_string(), "13".to_string());
        map.insert("tags".to_string(), "Tools, vision".to_string());
        map.insert("ignored".to_string(), "x".to_string());

        let filters = LibraryFilters::from_map(&map).unwrap();
        assert_eq!(filters.min_params, Some(0.5));
        assert_eq!(filters.max_params, Some(13.0));
        assert_eq!(filters.tags, vec!["tools", "vision"]);

        map.insert("min_context".to_string(), "lots".to_string());
        assert!(matches!(
            LibraryFilters::from_map(&map),
            Err(ModelError::Validation(_))
        ));
    }
}
