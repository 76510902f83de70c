//! Ollama server version compatibility

use semver::Version;

/// Oldest Ollama release Forge talks to
pub const MINIMUM_OLLAMA_VERSION: &str = "0.1.11";

/// Parse a server version string
///
/// Accepts an optional leading `v`, an optional pre-release or build suffix,
/// and tolerates a missing patch component (`0.2` reads as `0.2.0`).
pub fn parse_version(text: &str) -> Option<Version> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.len() == 2 && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit())) {
        return Version::parse(&format!("{}.{}.0{}", parts[0], parts[1], suffix)).ok();
    }

    None
}

/// Whether `version` is at least `minimum`; unparseable input is never compatible
pub fn is_version_at_least(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Some(version), Some(minimum)) => version >= minimum,
        _ => false,
    }
}

/// Whether an Ollama server reporting `version` is supported
pub fn is_compatible_ollama_version(version: &str) -> bool {
    is_version_at_least(version, MINIMUM_OLLAMA_VERSION)
}
