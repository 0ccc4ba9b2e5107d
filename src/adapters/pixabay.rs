//! Pixabay video search API (key required)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::{base, fetch_json};
use crate::core::error::AdapterError;
use crate::core::item::RawItem;
use crate::core::query::MediaKind;
use crate::core::source::{SearchRequest, SourceAdapter};

/// Rendition preference, best first
const RENDITIONS: [&str; 4] = ["medium", "large", "small", "tiny"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: Option<u64>,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    videos: std::collections::HashMap<String, Rendition>,
}

#[derive(Debug, Deserialize)]
struct Rendition {
    url: Option<String>,
    size: Option<u64>,
    thumbnail: Option<String>,
}

/// The API accepts 3..=200 results per page
fn per_page(limit: usize) -> usize {
    limit.clamp(3, 200)
}

fn hit_to_item(hit: &Hit) -> RawItem {
    let chosen = RENDITIONS
        .iter()
        .filter_map(|name| hit.videos.get(*name))
        .find(|r| r.url.as_deref().is_some_and(|u| !u.is_empty()));

    let id = hit.id.map(|id| id.to_string());
    let label = id.clone().unwrap_or_default();
    let title = if hit.tags.trim().is_empty() {
        format!("Pixabay Video {label}")
    } else {
        format!("Pixabay Video {label} - {}", hit.tags.trim())
    };

    RawItem {
        native_id: id,
        title: Some(title),
        kind: Some(MediaKind::Video),
        url: chosen.and_then(|r| r.url.clone()),
        preview_url: chosen.and_then(|r| r.thumbnail.clone()),
        size_bytes: chosen.and_then(|r| r.size),
    }
}

pub struct PixabayAdapter {
    client: Client,
    base_url: String,
}

impl PixabayAdapter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base(base_url),
        }
    }
}

#[async_trait]
impl SourceAdapter for PixabayAdapter {
    fn id(&self) -> &str {
        "pixabay"
    }

    fn requires_credential(&self) -> bool {
        true
    }


    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<RawItem>, AdapterError> {
        let key = request
            .credential
            .ok_or_else(|| AdapterError::auth("PIXABAY_API_KEY is not set"))?;
        let per_page = per_page(request.limit).to_string();
        let call = self
            .client
            .get(format!("{}/api/videos/", self.base_url))
            .query(&[
                ("key", key),
                ("q", request.query),
                ("video_type", "all"),
                ("safesearch", "true"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
            ])
            .timeout(request.timeout);

        let response: SearchResponse = fetch_json(call, "pixabay").await?;
        Ok(response
            .hits
            .iter()
            .take(request.limit)
            .map(hit_to_item)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::error::SearchErrorKind;
    use crate::core::query::MediaTypeFilter;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(limit: usize, credential: Option<&str>) -> SearchRequest<'_> {
        SearchRequest {
            query: "ocean",
            media_type: MediaTypeFilter::All,
            limit,
            timeout: Duration::from_secs(5),
            credential,
        }
    }

    #[test]
    fn test_per_page_is_clamped() {
        assert_eq!(per_page(1), 3);
        assert_eq!(per_page(50), 50);
        assert_eq!(per_page(1000), 200);
    }

    #[tokio::test]
    async fn test_rendition_preference_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/videos/"))
            .and(query_param("key", "k"))
            .and(query_param("per_page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [
                    {
                        "id": 7, "tags": "sea, waves",
                        "videos": {
                            "large": {"url": "https://cdn.test/7_large.mp4", "size": 900, "thumbnail": "https://cdn.test/7_l.jpg"},
                            "medium": {"url": "https://cdn.test/7_medium.mp4", "size": 500, "thumbnail": "https://cdn.test/7_m.jpg"}
                        }
                    },
                    {"id": 8, "tags": "", "videos": {"tiny": {"url": "https://cdn.test/8_tiny.mp4", "size": 10}}},
                    {"id": 9, "tags": "", "videos": {}}
                ]
            })))
            .mount(&server)
            .await;

        let adapter = PixabayAdapter::new(Client::new(), &server.uri());
        let items = adapter.search(&request(2, Some("k"))).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url.as_deref(), Some("https://cdn.test/7_medium.mp4"));
        assert_eq!(items[0].size_bytes, Some(500));
        assert_eq!(items[0].preview_url.as_deref(), Some("https://cdn.test/7_m.jpg"));
        assert_eq!(items[0].title.as_deref(), Some("Pixabay Video 7 - sea, waves"));
        assert_eq!(items[1].title.as_deref(), Some("Pixabay Video 8"));
        assert_eq!(items[1].kind, Some(MediaKind::Video));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = PixabayAdapter::new(Client::new(), &server.uri());
        let err = adapter.search(&request(5, Some("k"))).await.unwrap_err();
        assert_eq!(err.kind, SearchErrorKind::RateLimited);

        let err = adapter.search(&request(5, None)).await.unwrap_err();
        assert_eq!(err.kind, SearchErrorKind::AuthError);
    }
}
