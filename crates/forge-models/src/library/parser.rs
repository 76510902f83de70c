//! Extraction of models from library markup
//!
//! [`MarkupLibraryParser`] matches the handful of markers the library pages
//! use for model cards, pagination and detail fields. It does not build a
//! DOM; swap in another [`LibraryPageParser`] if the markup drifts.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::{LibraryMetadata, LibraryModel};

static MODEL_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(?:https?://[^"/]+)?/library/([A-Za-z0-9._:-]+)""#)
        .expect("valid model link regex")
});

static PAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="([^"]*[?&](?:amp;)?page=\d+[^"]*)""#).expect("valid page link regex")
});

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<p[^>]*>\s*([^<]+?)\s*</p>").expect("valid paragraph regex"));

static META_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta\s+name="description"\s+content="([^"]*)""#)
        .expect("valid meta description regex")
});

static CAPABILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"x-test-capability[^>]*>\s*([^<]+?)\s*<").expect("valid capability regex")
});

static SIZE_CHIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"x-test-size[^>]*>\s*([^<]+?)\s*<").expect("valid size chip regex"));

static PULL_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"x-test-pull-count[^>]*>\s*([^<]+?)\s*<").expect("valid pull count regex")
});

static UPDATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"x-test-updated[^>]*>\s*([^<]+?)\s*<").expect("valid updated regex")
});

static CONTEXT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+[kK])\s*context").expect("valid context field regex")
});

static QUANT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(q\d+_(?:k_[sml]|k|\d+))\b").expect("valid quantization field regex")
});

static LABELLED_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)>\s*(license|author|languages?)\s*:?\s*</[^>]+>\s*<[^>]+>\s*([^<]+?)\s*<")
        .expect("valid labelled field regex")
});

/// Models and onward links found on one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub models: Vec<LibraryModel>,
    /// Absolute URLs of further listing pages, in document order
    pub next_pages: Vec<String>,
}

pub trait LibraryPageParser: Send + Sync {
    fn parse_listing(&self, html: &str, page_url: &str) -> ListingPage;

    /// Enrich `model` with fields from its detail page
    fn parse_details(&self, html: &str, model: &mut LibraryModel);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupLibraryParser;

impl LibraryPageParser for MarkupLibraryParser {
    fn parse_listing(&self, html: &str, page_url: &str) -> ListingPage {
        let base = Url::parse(page_url).ok();
        let links: Vec<_> = MODEL_LINK.captures_iter(html).collect();

        let mut seen = HashSet::new();
        let mut models = Vec::new();
        for (i, caps) in links.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if !seen.insert(name.to_string()) {
                continue;
            }

            let card_end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(html.len(), |m| m.start());
            let card = &html[whole.end()..card_end];

            let url = resolve(base.as_ref(), &format!("/library/{}", name));
            let mut model = LibraryModel::new(name, url);
            if let Some(description) = first_capture(&PARAGRAPH, card) {
                model.description = description;
            }

            let capabilities = all_captures(&CAPABILITY, card);
            let sizes: Vec<String> = all_captures(&SIZE_CHIP, card)
                .into_iter()
                .map(|s| s.to_uppercase())
                .collect();
            model.tags = capabilities
                .iter()
                .cloned()
                .chain(sizes.iter().map(|s| s.to_lowercase()))
                .collect();
            model.metadata = LibraryMetadata {
                parameters: (!sizes.is_empty()).then(|| sizes.join(", ")),
                download_count: first_capture(&PULL_COUNT, card),
                last_updated: first_capture(&UPDATED, card),
                capabilities,
                ..LibraryMetadata::default()
            };
            models.push(model);
        }

        let mut next_pages = Vec::new();
        for caps in PAGE_LINK.captures_iter(html) {
            let Some(href) = caps.get(1) else { continue };
            let url = resolve(base.as_ref(), &href.as_str().replace("&amp;", "&"));
            if !next_pages.contains(&url) {
                next_pages.push(url);
            }
        }

        ListingPage { models, next_pages }
    }

    fn parse_details(&self, html: &str, model: &mut LibraryModel) {
        if let Some(description) = first_capture(&META_DESCRIPTION, html) {
            if !description.is_empty() {
                model.description = description;
            }
        }

        let capabilities = all_captures(&CAPABILITY, html);
        for capability in &capabilities {
            if !model.tags.contains(capability) {
                model.tags.push(capability.clone());
            }
        }
        if !capabilities.is_empty() {
            model.metadata.capabilities = capabilities;
        }

        let sizes: Vec<String> = all_captures(&SIZE_CHIP, html)
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect();
        if !sizes.is_empty() {
            model.metadata.parameters = Some(sizes.join(", "));
        }

        let meta = &mut model.metadata;
        if let Some(context) = first_capture(&CONTEXT_FIELD, html) {
            meta.context_length = Some(context.to_lowercase());
        }
        if let Some(quant) = first_capture(&QUANT_FIELD, html) {
            meta.quantization = Some(quant.to_uppercase());
        }
        if let Some(count) = first_capture(&PULL_COUNT, html) {
            meta.download_count = Some(count);
        }
        if let Some(updated) = first_capture(&UPDATED, html) {
            meta.last_updated = Some(updated);
        }

        for caps in LABELLED_FIELD.captures_iter(html) {
            let (Some(label), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let value = unescape(value.as_str());
            match label.as_str().to_lowercase().as_str() {
                "license" => meta.license = Some(value),
                "author" => meta.author = Some(value),
                _ => {
                    meta.languages = value
                        .split(',')
                        .map(|l| l.trim().to_string())
                        .filter(|l| !l.is_empty())
                        .collect();
                }
            }
        }
    }
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
}

fn all_captures(pattern: &Regex, text: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| unescape(m.as_str()))
    {
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

fn unescape(text: &str) -> String {
    text.trim()
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
