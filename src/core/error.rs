//! Error types for mediagrab
//!
//! Three layers of failure live here:
//! - [`Error`]: plumbing failures (unknown source names, client construction, bad input)
//! - [`SearchErrorKind`] / [`AdapterError`]: per-source search failures, never fatal to a batch
//! - [`DownloadErrorKind`]: per-item download failures, never fatal to a batch

use std::fmt;

use strsim::{jaro_winkler, normalized_levenshtein};

/// Failure categories a source adapter can report for one search call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum SearchErrorKind {
    /// The call did not complete within the API-call timeout
    Timeout,
    /// Missing or rejected credential
    AuthError,
    /// The platform throttled us
    RateLimited,
    /// Connection or transport failure
    NetworkError,
    /// The response could not be understood
    ParseError,
    /// Anything else, including a panicking adapter
    Unknown,
}

impl fmt::Display for SearchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchErrorKind::Timeout => "Timeout",
            SearchErrorKind::AuthError => "AuthError",
            SearchErrorKind::RateLimited => "RateLimited",
            SearchErrorKind::NetworkError => "NetworkError",
            SearchErrorKind::ParseError => "ParseError",
            SearchErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Typed failure returned by a source adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterError {
    pub kind: SearchErrorKind,
    pub message: String,
}

impl AdapterError {
    pub fn new(kind: SearchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::AuthError, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(SearchErrorKind::ParseError, message)
    }

    /// Map a non-success HTTP status to the search taxonomy
    pub fn from_status(status: reqwest::StatusCode, context: &str) -> Self {
        let kind = match status.as_u16() {
            401 | 403 => SearchErrorKind::AuthError,
            429 => SearchErrorKind::RateLimited,
            500..=599 => SearchErrorKind::NetworkError,
            _ => SearchErrorKind::Unknown,
        };
        Self::new(kind, format!("{context}: HTTP {status}"))
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AdapterError {}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            SearchErrorKind::Timeout
        } else if err.is_decode() {
            SearchErrorKind::ParseError
        } else if let Some(status) = err.status() {
            return AdapterError::from_status(status, "request failed");
        } else if err.is_connect() || err.is_request() || err.is_body() {
            SearchErrorKind::NetworkError
        } else {
            SearchErrorKind::Unknown
        };
        AdapterError::new(kind, err.to_string())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::parse(format!("malformed JSON: {err}"))
    }
}

/// Failure categories for a single item download
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DownloadErrorKind {
    /// Every attempt ran past the download timeout
    DownloadTimeout,
    /// Transport failure or bad HTTP status
    DownloadNetworkError,
    /// The payload could not be written to disk
    WriteError,
}

impl fmt::Display for DownloadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DownloadErrorKind::DownloadTimeout => "DownloadTimeout",
            DownloadErrorKind::DownloadNetworkError => "DownloadNetworkError",
            DownloadErrorKind::WriteError => "WriteError",
        };
        f.write_str(name)
    }
}

/// Find the closest known name using a blend of Jaro-Winkler and normalized Levenshtein.
///
/// Returns `None` for exact (case-insensitive) matches and for inputs that are
/// not close to anything.
pub fn suggest_correction(input: &str, candidates: &[&str]) -> Option<String> {
    let input_lower = input.to_lowercase();
    if candidates.iter().any(|c| c.eq_ignore_ascii_case(&input_lower)) {
        return None;
    }

    // Empirically, 0.7 keeps "giphyy" -> "giphy" while rejecting unrelated words.
    let min_threshold = 0.7;
    let mut best: Option<(&str, f64)> = None;

    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();
        let score = jaro_winkler(&input_lower, &candidate_lower) * 0.7
            + normalized_levenshtein(&input_lower, &candidate_lower) * 0.3;
        if score >= min_threshold && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    best.map(|(name, _)| name.to_string())
}

/// Main error type for mediagrab plumbing
#[derive(Debug)]
pub enum Error {
    /// Source identifier not recognized
    SourceNotFound {
        name: String,
        suggestion: Option<String>,
    },

    /// HTTP-specific error outside of a source search
    HttpError(String),

    /// File I/O error
    IoError(std::io::Error),

    /// Invalid configuration or parameters
    InvalidInput(String),

    /// Network connectivity issues
    NetworkError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SourceNotFound { name, suggestion } => match suggestion {
                Some(s) => write!(f, "Source '{name}' not supported. Did you mean '{s}'?"),
                None => write!(f, "Source '{name}' not supported"),
            },
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for mediagrab operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &["giphy", "morbotron", "frinkiac", "wikimedia", "pixabay", "mixkit"];

    #[test]
    fn test_suggest_correction_typos() {
        assert_eq!(suggest_correction("giphyy", NAMES), Some("giphy".to_string()));
        assert_eq!(suggest_correction("morbtron", NAMES), Some("morbotron".to_string()));
        assert_eq!(suggest_correction("wikimeda", NAMES), Some("wikimedia".to_string()));
        assert_eq!(suggest_correction("frinkac", NAMES), Some("frinkiac".to_string()));
    }

    #[test]
    fn test_suggest_correction_exact_and_unrelated() {
        assert_eq!(suggest_correction("giphy", NAMES), None);
        assert_eq!(suggest_correction("GIPHY", NAMES), None);
        assert_eq!(suggest_correction("zzzzzzzzzzzz", NAMES), None);
    }

    #[test]
    fn test_status_mapping() {
        let e = AdapterError::from_status(reqwest::StatusCode::UNAUTHORIZED, "giphy");
        assert_eq!(e.kind, SearchErrorKind::AuthError);
        let e = AdapterError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "giphy");
        assert_eq!(e.kind, SearchErrorKind::RateLimited);
        let e = AdapterError::from_status(reqwest::StatusCode::BAD_GATEWAY, "giphy");
        assert_eq!(e.kind, SearchErrorKind::NetworkError);
        let e = AdapterError::from_status(reqwest::StatusCode::NOT_FOUND, "giphy");
        assert_eq!(e.kind, SearchErrorKind::Unknown);
    }

    #[test]
    fn test_source_not_found_display() {
        let err = Error::SourceNotFound {
            name: "giphyy".to_string(),
            suggestion: Some("giphy".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Source 'giphyy' not supported. Did you mean 'giphy'?"
        );
    }
}
