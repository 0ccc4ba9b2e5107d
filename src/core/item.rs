//! Item and outcome types shared by the search and download halves

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::error::{AdapterError, DownloadErrorKind, SearchErrorKind};
use crate::core::query::MediaKind;

/// Item as reported by a source adapter, before normalization.
///
/// Every field is optional so an adapter can hand over whatever the platform
/// returned; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    /// Platform-native identifier, used for filename derivation
    pub native_id: Option<String>,
    pub title: Option<String>,
    /// Kind as reported by the platform; inferred from the URL when absent
    pub kind: Option<MediaKind>,
    pub url: Option<String>,
    pub preview_url: Option<String>,
    pub size_bytes: Option<u64>,
}

impl RawItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.native_id = Some(id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn preview(mut self, url: Option<String>) -> Self {
        self.preview_url = url;
        self
    }

    pub fn size(mut self, size: Option<u64>) -> Self {
        self.size_bytes = size;
        self
    }
}

/// What a single source produced for one search
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeBody {
    /// Non-empty, in the source's native order
    Items(Vec<RawItem>),
    Error {
        kind: SearchErrorKind,
        message: String,
    },
    /// The source answered but had nothing to offer
    Note(String),
}

/// Per-source result of one search call
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    pub source: String,
    pub body: OutcomeBody,
}

impl SourceOutcome {
    /// Build from an adapter result; an empty list becomes a status note.
    pub fn from_result(source: impl Into<String>, result: Result<Vec<RawItem>, AdapterError>) -> Self {
        let body = match result {
            Ok(items) if items.is_empty() => OutcomeBody::Note("No results found".to_string()),
            Ok(items) => OutcomeBody::Items(items),
            Err(err) => OutcomeBody::Error {
                kind: err.kind,
                message: err.message,
            },
        };
        Self {
            source: source.into(),
            body,
        }
    }

    pub fn error(source: impl Into<String>, kind: SearchErrorKind, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            body: OutcomeBody::Error {
                kind,
                message: message.into(),
            },
        }
    }

    pub fn items(&self) -> &[RawItem] {
        match &self.body {
            OutcomeBody::Items(items) => items,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.body, OutcomeBody::Error { .. })
    }
}

/// Unified, presentation-ready item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayItem {
    pub title: String,
    pub source: String,
    pub kind: MediaKind,
    pub url: String,
    pub preview_url: Option<String>,
    pub filename: String,
    pub size_bytes: Option<u64>,
}

/// Human-readable byte count, e.g. `1.5 MB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

impl fmt::Display for DisplayItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.source, self.title, self.kind)?;
        if let Some(size) = self.size_bytes {
            write!(f, " - {}", format_size(size))?;
        }
        Ok(())
    }
}

/// Where a successful download landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Why a download ended without a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub kind: DownloadErrorKind,
    pub message: String,
    pub attempts: u32,
}

/// Per-item result of the download manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub source: String,
    pub filename: String,
    pub outcome: Result<SavedFile, DownloadFailure>,
}

impl DownloadResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
