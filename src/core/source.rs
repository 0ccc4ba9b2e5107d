//! Source adapter contract and registry
//!
//! Every platform is reached through one [`SourceAdapter`] implementation,
//! selected by name from the registry in this module.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};

use crate::adapters::{
    frinkiac::FrinkiacAdapter, giphy::GiphyAdapter, mixkit::MixkitAdapter,
    morbotron::MorbotronAdapter, pixabay::PixabayAdapter, wikimedia::WikimediaAdapter,
};
use crate::core::error::{suggest_correction, AdapterError, Error, Result};
use crate::core::item::RawItem;
use crate::core::query::MediaTypeFilter;

/// Names accepted by [`resolve_source`], in display order
pub const SUPPORTED_SOURCES: &[&str] = &[
    "giphy",
    "morbotron",
    "frinkiac",
    "wikimedia",
    "pixabay",
    "mixkit",
];

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(
    "mediagrab/",
    env!("CARGO_PKG_VERSION"),
    " (+https://crates.io/crates/mediagrab)"
);

/// Download timeout used when neither the caller nor the source specify one
pub const FALLBACK_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-item download timeout for files served by a named source
pub fn download_timeout_for(source: &str) -> Duration {
    match source {
        "wikimedia" => Duration::from_secs(15),
        "pixabay" | "mixkit" => Duration::from_secs(20),
        _ => FALLBACK_DOWNLOAD_TIMEOUT,
    }
}

/// Everything an adapter needs for one search call
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Hint for adapters that pick a rendition per media type
    pub media_type: MediaTypeFilter,
    pub limit: usize,
    pub timeout: Duration,
    pub credential: Option<&'a str>,
}

/// Contract implemented by each platform collaborator
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, also used as the download subdirectory
    fn id(&self) -> &str;

    /// Whether [`SearchRequest::credential`] must be present
    fn requires_credential(&self) -> bool {
        false
    }

    /// Per-item download timeout for files served by this source
    fn default_download_timeout(&self) -> Duration {
        download_timeout_for(self.id())
    }

    /// Query the platform. Returns at most `request.limit` items in native order.
    async fn search(&self, request: &SearchRequest<'_>) -> std::result::Result<Vec<RawItem>, AdapterError>;
}

/// Base URLs for the built-in sources
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub giphy_base_url: String,
    pub morbotron_base_url: String,
    pub frinkiac_base_url: String,
    pub wikimedia_api_url: String,
    pub pixabay_base_url: String,
    pub mixkit_base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            giphy_base_url: "https://api.giphy.com".to_string(),
            morbotron_base_url: "https://morbotron.com".to_string(),
            frinkiac_base_url: "https://frinkiac.com".to_string(),
            wikimedia_api_url: "https://commons.wikimedia.org/w/api.php".to_string(),
            pixabay_base_url: "https://pixabay.com".to_string(),
            mixkit_base_url: "https://mixkit.co".to_string(),
        }
    }
}

impl SourceConfig {
    /// Point every source at one base URL (mock servers in tests)
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            giphy_base_url: base.to_string(),
            morbotron_base_url: base.to_string(),
            frinkiac_base_url: base.to_string(),
            wikimedia_api_url: format!("{base}/w/api.php"),
            pixabay_base_url: base.to_string(),
            mixkit_base_url: base.to_string(),
        }
    }
}

/// Build the HTTP client shared by the adapters
pub fn http_client() -> Result<Client> {
    ClientBuilder::new()
        .tcp_keepalive(Duration::from_secs(60))
        .pool_idle_timeout(Duration::from_secs(90))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(Into::into)
}

/// Resolve one source name to its adapter
pub fn resolve_source(name: &str, config: &SourceConfig, client: &Client) -> Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match name.trim().to_ascii_lowercase().as_str() {
        "giphy" => Arc::new(GiphyAdapter::new(client.clone(), &config.giphy_base_url)),
        "morbotron" => Arc::new(MorbotronAdapter::new(client.clone(), &config.morbotron_base_url)),
        "frinkiac" => Arc::new(FrinkiacAdapter::new(client.clone(), &config.frinkiac_base_url)),
        "wikimedia" => Arc::new(WikimediaAdapter::new(client.clone(), &config.wikimedia_api_url)),
        "pixabay" => Arc::new(PixabayAdapter::new(client.clone(), &config.pixabay_base_url)),
        "mixkit" => Arc::new(MixkitAdapter::new(client.clone(), &config.mixkit_base_url)),
        _ => {
            return Err(Error::SourceNotFound {
                name: name.to_string(),
                suggestion: suggest_correction(name, SUPPORTED_SOURCES),
            })
        }
    };
    Ok(adapter)
}

/// Resolve a list of names, dropping duplicates but keeping request order
pub fn resolve_sources<S: AsRef<str>>(
    names: &[S],
    config: &SourceConfig,
    client: &Client,
) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    if names.is_empty() {
        return Err(Error::InvalidInput("at least one source must be selected".to_string()));
    }
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(names.len());
    for name in names {
        let adapter = resolve_source(name.as_ref(), config, client)?;
        if adapters.iter().all(|a| a.id() != adapter.id()) {
            adapters.push(adapter);
        }
    }
    Ok(adapters)
}

/// Lowercase extension of the last path segment of `url`, if any
pub(crate) fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?.to_string();
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Join a possibly relative href onto a base URL
pub(crate) fn absolutize(base: &str, href: &str) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    let base = url::Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}
