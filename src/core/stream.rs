//! Download options and per-item state reporting

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::DownloadErrorKind;
use crate::core::source::{download_timeout_for, FALLBACK_DOWNLOAD_TIMEOUT, SUPPORTED_SOURCES};

/// Batch progress callback: `(completed, total)` items
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Receives every state transition of every item: `(filename, state)`
pub type StateObserver = Arc<dyn Fn(&str, &DownloadState) + Send + Sync>;

/// Lifecycle of one item in the download manager.
///
/// `Pending -> Fetching{1} -> .. -> Fetching{n} -> Succeeded | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Pending,
    /// 1-based attempt number
    Fetching { attempt: u32 },
    Succeeded,
    Failed(DownloadErrorKind),
}

impl DownloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadState::Succeeded | DownloadState::Failed(_))
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadState::Pending => write!(f, "pending"),
            DownloadState::Fetching { attempt } => write!(f, "fetching (attempt {attempt})"),
            DownloadState::Succeeded => write!(f, "succeeded"),
            DownloadState::Failed(kind) => write!(f, "failed ({kind})"),
        }
    }
}

/// Options for download operations
#[derive(Clone)]
pub struct DownloadOptions {
    /// Optional batch progress callback
    pub progress: Option<ProgressCallback>,

    /// Optional per-item state observer
    pub observer: Option<StateObserver>,

    /// Maximum number of items fetched at the same time
    pub concurrency: usize,

    /// Retries after the first attempt on timeout or transient network failure
    pub max_retries: u32,

    /// Base delay for exponential backoff between attempts
    pub retry_base_delay: Duration,

    /// Per-attempt timeout for each source, used when the caller gives none
    pub source_timeouts: HashMap<String, Duration>,

    /// Per-attempt timeout when neither the caller nor the source give one
    pub fallback_timeout: Duration,

    /// Buffer size for writing the payload
    pub buffer_size: usize,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            progress: None,
            observer: None,
            concurrency: default_concurrency(),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            source_timeouts: SUPPORTED_SOURCES
                .iter()
                .map(|source| (source.to_string(), download_timeout_for(source)))
                .collect(),
            fallback_timeout: FALLBACK_DOWNLOAD_TIMEOUT,
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("progress", &self.progress.is_some())
            .field("observer", &self.observer.is_some())
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("source_timeouts", &self.source_timeouts)
            .field("fallback_timeout", &self.fallback_timeout)
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

impl DownloadOptions {
    /// Timeout for one attempt at an item from `source`
    pub fn timeout_for(&self, source: &str, requested: Option<Duration>) -> Duration {
        requested
            .or_else(|| self.source_timeouts.get(source).copied())
            .unwrap_or(self.fallback_timeout)
    }
}

/// Worker cap derived from the machine, kept small since payloads are media files
pub fn default_concurrency() -> usize {
    (num_cpus::get() * 2).clamp(2, 8)
}
