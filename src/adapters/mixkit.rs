//! Mixkit stock video search
//!
//! The results page embeds its data as Next.js page props in
//! `script#__NEXT_DATA__`; items are read from there rather than the markup.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::adapters::{base, fetch_text};
use crate::core::error::AdapterError;
use crate::core::item::RawItem;
use crate::core::query::MediaKind;
use crate::core::source::{SearchRequest, SourceAdapter};

/// Where the item list has been seen inside `props.pageProps`
const ITEM_PATHS: [&str; 3] = ["/initialItems/data", "/items/data", "/tag/items/data"];

/// URL keys, best first
const URL_KEYS: [&str; 3] = ["download_url_video_hd", "download_url_video_sd", "download_url"];

const RESOLUTIONS: [&str; 3] = ["1080p", "720p", "480p"];

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(value_to_string)
}

/// Pull the embedded page data out of the HTML
fn next_data(html: &str) -> Result<Value, AdapterError> {
    let document = Html::parse_document(html);
    let sel = Selector::parse("script#__NEXT_DATA__")
        .map_err(|e| AdapterError::parse(format!("bad selector: {e}")))?;
    let script = document
        .select(&sel)
        .next()
        .ok_or_else(|| AdapterError::parse("mixkit: page has no __NEXT_DATA__ script"))?;
    let text: String = script.text().collect();
    Ok(serde_json::from_str(&text)?)
}

fn video_url(item: &Value) -> Option<String> {
    URL_KEYS
        .iter()
        .find_map(|key| str_field(item, key))
        .or_else(|| {
            let resolutions = item.pointer("/metadata/resolutions")?.as_object()?;
            RESOLUTIONS
                .iter()
                .find_map(|r| resolutions.get(*r).and_then(value_to_string))
                .or_else(|| resolutions.values().find_map(value_to_string))
        })
}

fn item_to_raw(item: &Value) -> RawItem {
    let id = str_field(item, "id");
    let title = str_field(item, "name")
        .unwrap_or_else(|| format!("Mixkit Video {}", id.clone().unwrap_or_default()));
    let size = item
        .get("size_bytes")
        .and_then(Value::as_u64)
        .or_else(|| item.pointer("/metadata/size_bytes").and_then(Value::as_u64));

    RawItem {
        native_id: id,
        title: Some(title),
        kind: Some(MediaKind::Video),
        url: video_url(item),
        preview_url: str_field(item, "thumbnail_url").or_else(|| str_field(item, "poster_url")),
        size_bytes: size,
    }
}

/// Video items from the page data, at most `limit`
fn extract_items(data: &Value, limit: usize) -> Vec<RawItem> {
    let Some(props) = data.pointer("/props/pageProps") else {
        return Vec::new();
    };
    let Some(list) = ITEM_PATHS
        .iter()
        .find_map(|p| props.pointer(p).and_then(Value::as_array))
    else {
        return Vec::new();
    };
    list.iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("video"))
        .take(limit)
        .map(item_to_raw)
        .collect()
}

pub struct MixkitAdapter {
    client: Client,
    base_url: String,
}

impl MixkitAdapter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base(base_url),
        }
    }
}

#[async_trait]
impl SourceAdapter for MixkitAdapter {
    fn id(&self) -> &str {
        "mixkit"
    }


    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<RawItem>, AdapterError> {
        let call = self
            .client
            .get(format!("{}/free-stock-video/search/", self.base_url))
            .query(&[("q", request.query)])
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Accept", "text/html,application/xhtml+xml")
            .timeout(request.timeout);
        let html = fetch_text(call, "mixkit").await?;
        let data = next_data(&html)?;
        Ok(extract_items(&data, request.limit))
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

    fn page(data: &Value) -> String {
        format!(
            r#"<html><head></head><body><div id="__next"></div><script id="__NEXT_DATA__" type="application/json">{data}</script></body></html>"#
        )
    }

    fn request() -> SearchRequest<'static> {
        SearchRequest {
            query: "rain",
            media_type: MediaTypeFilter::All,
            limit: 5,
            timeout: Duration::from_secs(5),
            credential: None,
        }
    }

    #[test]
    fn test_extract_items_paths_and_fallbacks() {
        let data = json!({"props": {"pageProps": {"tag": {"items": {"data": [
            {"id": 1, "type": "video", "name": "Rain", "download_url_video_sd": "https://cdn.test/1_sd.mp4",
             "poster_url": "https://cdn.test/1.jpg", "metadata": {"size_bytes": 42}},
            {"id": 2, "type": "music", "name": "Song", "download_url": "https://cdn.test/2.mp3"},
            {"id": 3, "type": "video", "metadata": {"resolutions": {"720p": "https://cdn.test/3_720.mp4"}}}
        ]}}}}});
        let items = extract_items(&data, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url.as_deref(), Some("https://cdn.test/1_sd.mp4"));
        assert_eq!(items[0].size_bytes, Some(42));
        assert_eq!(items[0].preview_url.as_deref(), Some("https://cdn.test/1.jpg"));
        assert_eq!(items[1].url.as_deref(), Some("https://cdn.test/3_720.mp4"));
        assert_eq!(items[1].title.as_deref(), Some("Mixkit Video 3"));
        assert!(extract_items(&json!({}), 10).is_empty());
    }

    #[tokio::test]
    async fn test_search_reads_embedded_data() {
        let data = json!({"props": {"pageProps": {"initialItems": {"data": [
            {"id": "a1", "type": "video", "name": "Rainy window",
             "download_url_video_hd": "https://cdn.test/a1_hd.mp4", "thumbnail_url": "https://cdn.test/a1.jpg"}
        ]}}}});
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/free-stock-video/search/"))
            .and(query_param("q", "rain"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(&data)))
            .mount(&server)
            .await;

        let adapter = MixkitAdapter::new(Client::new(), &server.uri());
        let items = adapter.search(&request()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].native_id.as_deref(), Some("a1"));
        assert_eq!(items[0].url.as_deref(), Some("https://cdn.test/a1_hd.mp4"));
    }

    #[tokio::test]
    async fn test_missing_script_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>blocked</body></html>"))
            .mount(&server)
            .await;

        let adapter = MixkitAdapter::new(Client::new(), &server.uri());
        let err = adapter.search(&request()).await.unwrap_err();
        assert_eq!(err.kind, SearchErrorKind::ParseError);
    }
}
