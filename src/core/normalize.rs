//! Normalization of raw source items into [`DisplayItem`]s
//!
//! Also owns filename sanitization and the per-source status report, since
//! both depend on what survives normalization.

use std::fmt;

use log::debug;
use sha2::{Digest, Sha256};

use crate::core::error::SearchErrorKind;
use crate::core::item::{DisplayItem, OutcomeBody, RawItem, SourceOutcome};
use crate::core::query::{MediaKind, MediaTypeFilter, Query};
use crate::core::source::url_extension;

/// Longest filename (extension included) we ever produce
pub const MAX_FILENAME_LEN: usize = 120;

/// Longest query fragment embedded in a filename
const MAX_QUERY_FRAGMENT_LEN: usize = 40;

/// Result of normalizing one outcome
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub items: Vec<DisplayItem>,
    /// Raw items that could not be converted
    pub skipped: usize,
}

/// Why a raw item could not become a [`DisplayItem`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    MissingUrl,
    InvalidUrl(String),
    UnknownKind(String),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::MissingUrl => write!(f, "item has no media URL"),
            ConversionError::InvalidUrl(url) => write!(f, "'{url}' is not an absolute http(s) URL"),
            ConversionError::UnknownKind(url) => write!(f, "cannot infer media kind of '{url}'"),
        }
    }
}

/// Replace anything outside `[A-Za-z0-9._-]`, collapse separators and cap the length.
///
/// The result never contains a path separator or `..`, never starts with a
/// dot, and is never empty.
pub fn sanitize_component(input: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            c
        } else {
            '_'
        };
        // collapse "__" and ".." runs
        if (mapped == '_' || mapped == '.') && out.ends_with(mapped) {
            continue;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_matches(|c| c == '_' || c == '.');
    let mut result: String = trimmed.chars().take(max_len.max(1)).collect();
    while result.ends_with('_') || result.ends_with('.') {
        result.pop();
    }
    if result.is_empty() {
        "item".to_string()
    } else {
        result
    }
}

/// Sanitize a full filename, keeping the extension intact within [`MAX_FILENAME_LEN`]
pub fn sanitize_filename(name: &str) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.len() <= 5 => {
            (stem, Some(sanitize_component(ext, 5).to_ascii_lowercase()))
        }
        _ => (name, None),
    };
    match ext {
        Some(ext) => {
            let budget = MAX_FILENAME_LEN.saturating_sub(ext.len() + 1);
            format!("{}.{ext}", sanitize_component(stem, budget))
        }
        None => sanitize_component(stem, MAX_FILENAME_LEN),
    }
}

/// First two words of the query, lowercased and sanitized
pub fn query_fragment(query: &str) -> String {
    let words: Vec<&str> = query.split_whitespace().take(2).collect();
    sanitize_component(&words.join("_").to_lowercase(), MAX_QUERY_FRAGMENT_LEN)
}

/// Directory name used for a query under the download root
pub fn query_dirname(query: &str) -> String {
    sanitize_component(query.trim(), 50)
}

/// Short stable digest of the media URL, used when the source has no native id
fn url_digest(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..6])
}

/// Deterministic filename for an item: `<source>_<query>_<id>.<ext>`
pub fn derive_filename(source: &str, query: &str, raw: &RawItem, url: &str, kind: MediaKind) -> String {
    let id = raw
        .native_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url_digest(url));
    let ext = url_extension(url)
        .filter(|ext| MediaKind::from_extension(ext).is_some())
        .unwrap_or_else(|| kind.default_extension().to_string());
    sanitize_filename(&format!("{source}_{}_{id}.{ext}", query_fragment(query)))
}

/// Convert one raw item, or explain why not
pub fn convert(source: &str, query: &str, raw: &RawItem) -> Result<DisplayItem, ConversionError> {
    let url = raw
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(ConversionError::MissingUrl)?;
    let parsed = url::Url::parse(url).map_err(|_| ConversionError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConversionError::InvalidUrl(url.to_string()));
    }

    let kind = raw
        .kind
        .or_else(|| url_extension(url).and_then(|ext| MediaKind::from_extension(&ext)))
        .ok_or_else(|| ConversionError::UnknownKind(url.to_string()))?;

    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(query)
        .to_string();

    let preview_url = raw
        .preview_url
        .as_deref()
        .filter(|p| url::Url::parse(p).is_ok())
        .map(str::to_string);

    Ok(DisplayItem {
        title,
        source: source.to_string(),
        kind,
        url: parsed.to_string(),
        preview_url,
        filename: derive_filename(source, query, raw, url, kind),
        size_bytes: raw.size_bytes,
    })
}

/// Normalize one outcome under the given filter.
///
/// Unconvertible items are skipped and counted; filtered items are dropped
/// silently. Native order is preserved.
pub fn normalize(outcome: &SourceOutcome, query: &str, filter: MediaTypeFilter) -> Normalized {
    let mut normalized = Normalized::default();
    for raw in outcome.items() {
        match convert(&outcome.source, query, raw) {
            Ok(item) if filter.accepts(item.kind) => normalized.items.push(item),
            Ok(_) => {}
            Err(e) => {
                debug!("{}: skipping item: {e}", outcome.source);
                normalized.skipped += 1;
            }
        }
    }
    normalized
}

/// Per-source line of the status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Found(usize),
    NoItems,
    Failed {
        kind: SearchErrorKind,
        message: String,
    },
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Found(n) => write!(f, "Found {n} item(s)"),
            SourceStatus::NoItems => write!(f, "No items found"),
            SourceStatus::Failed { kind, message } => write!(f, "Error ({kind}): {message}"),
        }
    }
}

/// Everything a front end needs to render one search
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcomes: Vec<SourceOutcome>,
    /// One entry per outcome, same order
    pub statuses: Vec<(String, SourceStatus)>,
    /// All normalized items, source-then-arrival order
    pub items: Vec<DisplayItem>,
    pub skipped: usize,
}

impl SearchReport {
    /// Normalize every outcome of a query and derive the status report
    pub fn build(query: &Query, outcomes: Vec<SourceOutcome>) -> Self {
        let mut statuses = Vec::with_capacity(outcomes.len());
        let mut items = Vec::new();
        let mut skipped = 0;

        for outcome in &outcomes {
            let status = match &outcome.body {
                OutcomeBody::Error { kind, message } => SourceStatus::Failed {
                    kind: *kind,
                    message: message.clone(),
                },
                OutcomeBody::Note(_) => SourceStatus::NoItems,
                OutcomeBody::Items(_) => {
                    let normalized = normalize(outcome, query.text(), query.media_type());
                    skipped += normalized.skipped;
                    let count = normalized.items.len();
                    items.extend(normalized.items);
                    if count == 0 {
                        SourceStatus::NoItems
                    } else {
                        SourceStatus::Found(count)
                    }
                }
            };
            statuses.push((outcome.source.clone(), status));
        }

        Self {
            outcomes,
            statuses,
            items,
            skipped,
        }
    }

    pub fn status_of(&self, source: &str) -> Option<&SourceStatus> {
        self.statuses.iter().find(|(s, _)| s == source).map(|(_, status)| status)
    }
}
