//! Relevance scoring for cross-source search results

use crate::model::ModelInfo;

const NAME_CONTAINS: u32 = 10;
const NAME_PREFIX: u32 = 5;
const TAG_CONTAINS: u32 = 8;
const DESCRIPTION_CONTAINS: u32 = 5;
const INSTALLED_BONUS: u32 = 3;

/// Split a query into lower-cased whitespace-separated terms
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Score a model against query terms
///
/// Each term earns points for a name hit, a name prefix, every matching tag
/// and a description hit. Installed models get a flat bonus on top.
pub fn relevance_score(model: &ModelInfo, terms: &[String]) -> u32 {
    let name = model.name.to_lowercase();
    let description = model.description.to_lowercase();
    let tags: Vec<String> = model.tags.iter().map(|t| t.to_lowercase()).collect();

    let mut score = 0;
    for term in terms {
        if name.contains(term.as_str()) {
            score += NAME_CONTAINS;
        }
        if name.starts_with(term.as_str()) {
            score += NAME_PREFIX;
        }
        score += TAG_CONTAINS * tags.iter().filter(|t| t.contains(term.as_str())).count() as u32;
        if description.contains(term.as_str()) {
            score += DESCRIPTION_CONTAINS;
        }
    }

    if model.installed {
        score += INSTALLED_BONUS;
    }
    score
}
