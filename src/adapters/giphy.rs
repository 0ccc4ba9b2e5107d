//! Giphy search API (key required)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::{base, fetch_json};
use crate::core::error::AdapterError;
use crate::core::item::RawItem;
use crate::core::query::{MediaKind, MediaTypeFilter};
use crate::core::source::{SearchRequest, SourceAdapter};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Gif>,
}

#[derive(Debug, Deserialize)]
struct Gif {
    id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    #[serde(default)]
    images: Images,
}

#[derive(Debug, Default, Deserialize)]
struct Images {
    original: Option<Rendition>,
    original_mp4: Option<Rendition>,
    hd: Option<Rendition>,
    fixed_height_small: Option<Rendition>,
}

/// Giphy reports sizes as decimal strings
#[derive(Debug, Deserialize)]
struct Rendition {
    url: Option<String>,
    mp4: Option<String>,
    size: Option<String>,
    mp4_size: Option<String>,
}

fn parse_size(size: &Option<String>) -> Option<u64> {
    size.as_deref().and_then(|s| s.parse().ok())
}

pub struct GiphyAdapter {
    client: Client,
    base_url: String,
}

impl GiphyAdapter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base(base_url),
        }
    }
}

/// Pick the rendition matching the requested media type
fn to_raw_item(gif: Gif, media_type: MediaTypeFilter) -> RawItem {
    let images = &gif.images;
    let wants_video = matches!(media_type, MediaTypeFilter::All | MediaTypeFilter::Only(MediaKind::Video));
    let is_sticker = gif.kind.as_deref() == Some("sticker");

    let (url, kind, size) = if is_sticker {
        let original = images.original.as_ref();
        (
            original.and_then(|r| r.url.clone()),
            MediaKind::Sticker,
            original.and_then(|r| parse_size(&r.size)),
        )
    } else if let Some(mp4) = images
        .original_mp4
        .as_ref()
        .filter(|_| wants_video)
        .and_then(|r| r.mp4.clone().map(|url| (url, parse_size(&r.mp4_size))))
    {
        (Some(mp4.0), MediaKind::Video, mp4.1)
    } else if let Some(hd) = images.hd.as_ref().filter(|_| wants_video).and_then(|r| r.mp4.clone()) {
        (Some(hd), MediaKind::Video, None)
    } else {
        let original = images.original.as_ref();
        (
            original.and_then(|r| r.url.clone()),
            MediaKind::Gif,
            original.and_then(|r| parse_size(&r.size)),
        )
    };

    let id = gif.id.unwrap_or_default();
    let title = gif
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| format!("Giphy {id}"));

    RawItem {
        native_id: Some(id).filter(|id| !id.is_empty()),
        title: Some(title),
        kind: Some(kind),
        url,
        preview_url: images.fixed_height_small.as_ref().and_then(|r| r.url.clone()),
        size_bytes: size,
    }
}

#[async_trait]
impl SourceAdapter for GiphyAdapter {
    fn id(&self) -> &str {
        "giphy"
    }

    fn requires_credential(&self) -> bool {
        true
    }


    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<RawItem>, AdapterError> {
        let key = request
            .credential
            .ok_or_else(|| AdapterError::auth("GIPHY_API_KEY is not set"))?;
        let limit = request.limit.to_string();
        let call = self
            .client
            .get(format!("{}/v1/gifs/search", self.base_url))
            .query(&[
                ("api_key", key),
                ("q", request.query),
                ("limit", limit.as_str()),
                ("offset", "0"),
                ("rating", "g"),
                ("lang", "en"),
            ])
            .timeout(request.timeout);

        let response: SearchResponse = fetch_json(call, "giphy").await?;
        Ok(response
            .data
            .into_iter()
            .take(request.limit)
            .map(|gif| to_raw_item(gif, request.media_type))
            .collect())
    }
}
