//! Search request model
//!
//! A [`Query`] is built once per search and only read afterwards.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::core::error::Error;

/// Default per-source item cap
pub const DEFAULT_LIMIT: usize = 5;

/// Default bound on one adapter call
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(10);

/// The kind of media an item carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Gif,
    Video,
    Audio,
    Sticker,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Gif => "gif",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Sticker => "sticker",
        }
    }

    /// Extension used when the media URL does not carry a usable one
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Gif | MediaKind::Sticker => "gif",
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    /// Infer a kind from a lowercase file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "gif" => Some(MediaKind::Gif),
            "jpg" | "jpeg" | "png" | "svg" | "tif" | "tiff" | "webp" | "bmp" => {
                Some(MediaKind::Image)
            }
            "mp4" | "webm" | "ogv" | "mov" | "mpeg" | "mpg" | "mkv" => Some(MediaKind::Video),
            "mp3" | "ogg" | "oga" | "wav" | "flac" | "opus" | "mid" | "m4a" => {
                Some(MediaKind::Audio)
            }
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested media type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaTypeFilter {
    #[default]
    All,
    Only(MediaKind),
}

impl MediaTypeFilter {
    /// Whether an item of `kind` passes this filter
    pub fn accepts(&self, kind: MediaKind) -> bool {
        match self {
            MediaTypeFilter::All => true,
            MediaTypeFilter::Only(wanted) => *wanted == kind,
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            MediaTypeFilter::All => None,
            MediaTypeFilter::Only(kind) => Some(*kind),
        }
    }
}

impl FromStr for MediaTypeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(MediaTypeFilter::All),
            "image" => Ok(MediaTypeFilter::Only(MediaKind::Image)),
            "gif" => Ok(MediaTypeFilter::Only(MediaKind::Gif)),
            "video" => Ok(MediaTypeFilter::Only(MediaKind::Video)),
            "audio" => Ok(MediaTypeFilter::Only(MediaKind::Audio)),
            "sticker" => Ok(MediaTypeFilter::Only(MediaKind::Sticker)),
            other => Err(Error::InvalidInput(format!(
                "unknown media type '{other}' (expected all, image, gif, video, audio or sticker)"
            ))),
        }
    }
}

impl fmt::Display for MediaTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaTypeFilter::All => f.write_str("all"),
            MediaTypeFilter::Only(kind) => f.write_str(kind.as_str()),
        }
    }
}

/// One search request: the text plus its constraints
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    media_type: MediaTypeFilter,
    limit: usize,
    api_timeout: Duration,
    download_timeout: Option<Duration>,
}

impl Query {
    /// Create a query with default constraints. Fails on blank text.
    pub fn new(text: impl Into<String>) -> crate::core::error::Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("search query must not be empty".to_string()));
        }
        Ok(Self {
            text,
            media_type: MediaTypeFilter::All,
            limit: DEFAULT_LIMIT,
            api_timeout: DEFAULT_API_TIMEOUT,
            download_timeout: None,
        })
    }

    pub fn with_media_type(mut self, media_type: MediaTypeFilter) -> Self {
        self.media_type = media_type;
        self
    }

    /// Per-source item cap; zero is raised to one
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn media_type(&self) -> MediaTypeFilter {
        self.media_type
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert_eq!("all".parse::<MediaTypeFilter>().unwrap(), MediaTypeFilter::All);
        assert_eq!(
            "GIF".parse::<MediaTypeFilter>().unwrap(),
            MediaTypeFilter::Only(MediaKind::Gif)
        );
        assert!("pdf".parse::<MediaTypeFilter>().is_err());
    }

    #[test]
    fn test_filter_accepts() {
        let gif = MediaTypeFilter::Only(MediaKind::Gif);
        assert!(gif.accepts(MediaKind::Gif));
        assert!(!gif.accepts(MediaKind::Sticker));
        assert!(MediaTypeFilter::All.accepts(MediaKind::Audio));
    }

    #[test]
    fn test_query_rejects_blank_text() {
        assert!(Query::new("   ").is_err());
        let q = Query::new("cats").unwrap().with_limit(0);
        assert_eq!(q.limit(), 1);
        assert_eq!(q.api_timeout(), DEFAULT_API_TIMEOUT);
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(MediaKind::from_extension("gif"), Some(MediaKind::Gif));
        assert_eq!(MediaKind::from_extension("webm"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("flac"), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_extension("exe"), None);
    }
}
