//! # mediagrab
//!
//! Search several online media platforms at once, merge their answers into
//! one item list, and download the chosen items into a predictable layout.
//!
//! ## Features
//!
//! - **Concurrent fan-out**: every source is queried at the same time under one timeout
//! - **Failure isolation**: a failing, slow or panicking source only affects its own status line
//! - **Unified items**: heterogeneous platform responses become [`DisplayItem`]s
//! - **Safe downloads**: bounded retries, collision-safe names, no partial files left behind
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let query = mediagrab::Query::new("cats")?;
//!     let report = mediagrab::search(&query, &["giphy", "wikimedia"]).await?;
//!     for (source, status) in &report.statuses {
//!         println!("{source}: {status}");
//!     }
//!
//!     let picked = mediagrab::select(&report.items, 3);
//!     let results = mediagrab::download(&picked, "downloaded", query.text()).await?;
//!     println!("{} downloaded", results.iter().filter(|r| r.is_success()).count());
//!     Ok(())
//! }
//! ```
//!
//! ## Progress Tracking
//!
//! ```rust,no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let items = Vec::new();
//! mediagrab::download_with_progress(&items, "downloaded", "cats", |done, total| {
//!     println!("{done}/{total} items");
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

pub mod adapters;
mod core;

pub use crate::core::aggregator::Aggregator;
pub use crate::core::config::{Credentials, CREDENTIAL_ENV_VARS};
pub use crate::core::downloader::Downloader;
pub use crate::core::error::{
    suggest_correction, AdapterError, DownloadErrorKind, Error, Result, SearchErrorKind,
};
pub use crate::core::item::{
    format_size, DisplayItem, DownloadFailure, DownloadResult, OutcomeBody, RawItem, SavedFile,
    SourceOutcome,
};
pub use crate::core::normalize::{
    convert, derive_filename, normalize, query_dirname, sanitize_component, sanitize_filename,
    ConversionError, Normalized, SearchReport, SourceStatus, MAX_FILENAME_LEN,
};
pub use crate::core::query::{MediaKind, MediaTypeFilter, Query, DEFAULT_API_TIMEOUT, DEFAULT_LIMIT};
pub use crate::core::selector::{parse_selection, select, select_interactive, select_per_source};
pub use crate::core::source::{
    download_timeout_for, http_client, resolve_source, resolve_sources, SearchRequest,
    SourceAdapter, SourceConfig, FALLBACK_DOWNLOAD_TIMEOUT, SUPPORTED_SOURCES, USER_AGENT,
};
pub use crate::core::stream::{
    default_concurrency, DownloadOptions, DownloadState, ProgressCallback, StateObserver,
};

/// Search the named built-in sources with credentials from the environment
///
/// Unknown source names fail before any request is made. Per-source
/// failures never fail the call; they show up in [`SearchReport::statuses`].
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let query = mediagrab::Query::new("good news everyone")?;
/// let report = mediagrab::search(&query, &["morbotron", "frinkiac"]).await?;
/// println!("{} item(s)", report.items.len());
/// # Ok(())
/// # }
/// ```
pub async fn search<S: AsRef<str>>(query: &Query, sources: &[S]) -> Result<SearchReport> {
    let client = http_client()?;
    let adapters = resolve_sources(sources, &SourceConfig::default(), &client)?;
    let aggregator = Aggregator::new(Credentials::from_env());
    let outcomes = aggregator.search(query, &adapters).await;
    Ok(SearchReport::build(query, outcomes))
}

/// Download items into `dest_root/<query>/<source>/` with default options
pub async fn download<P: AsRef<Path>>(
    items: &[DisplayItem],
    dest_root: P,
    query: &str,
) -> Result<Vec<DownloadResult>> {
    let downloader = Downloader::new(DownloadOptions::default())?;
    Ok(downloader.download_all(items, dest_root.as_ref(), query, None).await)
}

/// Download with a batch progress callback receiving `(completed, total)` items
pub async fn download_with_progress<P, F>(
    items: &[DisplayItem],
    dest_root: P,
    query: &str,
    progress: F,
) -> Result<Vec<DownloadResult>>
where
    P: AsRef<Path>,
    F: Fn(u64, u64) + Send + Sync + 'static,
{
    let options = DownloadOptions {
        progress: Some(Arc::new(progress)),
        ..Default::default()
    };
    let downloader = Downloader::new(options)?;
    Ok(downloader.download_all(items, dest_root.as_ref(), query, None).await)
}
