//! Wikimedia Commons file search via the MediaWiki action API
//!
//! Works anonymously; an access token, when configured, is sent as a bearer
//! token for higher rate limits.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::fetch_json;
use crate::core::error::{AdapterError, SearchErrorKind};
use crate::core::item::RawItem;
use crate::core::query::MediaKind;
use crate::core::source::{url_extension, SearchRequest, SourceAdapter};

/// Thumbnail width requested for previews
const PREVIEW_WIDTH: &str = "320";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    error: Option<ApiError>,
    query: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    pageid: Option<u64>,
    title: Option<String>,
    /// Search rank; the page map itself is unordered
    index: Option<u32>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
    size: Option<u64>,
    mediatype: Option<String>,
    thumburl: Option<String>,
    #[serde(default)]
    extmetadata: HashMap<String, MetaValue>,
}

#[derive(Debug, Deserialize)]
struct MetaValue {
    value: Option<serde_json::Value>,
}

impl ApiError {
    fn into_adapter_error(self) -> AdapterError {
        let code = self.code.to_ascii_lowercase();
        let kind = if ["auth", "token", "permission", "denied", "login"]
            .iter()
            .any(|hint| code.contains(hint))
        {
            SearchErrorKind::AuthError
        } else if code.contains("ratelimit") {
            SearchErrorKind::RateLimited
        } else {
            SearchErrorKind::Unknown
        };
        AdapterError::new(kind, format!("wikimedia API error {}: {}", self.code, self.info))
    }
}

/// Kind from the API media type, refined by the file extension
fn infer_kind(mediatype: Option<&str>, url: Option<&str>) -> Option<MediaKind> {
    let ext = url.and_then(url_extension);
    let from_ext = ext.as_deref().and_then(MediaKind::from_extension);
    match mediatype.map(str::to_ascii_uppercase).as_deref() {
        Some("BITMAP") | Some("DRAWING") => {
            if ext.as_deref() == Some("gif") {
                Some(MediaKind::Gif)
            } else {
                Some(MediaKind::Image)
            }
        }
        Some("VIDEO") => Some(MediaKind::Video),
        Some("AUDIO") => Some(MediaKind::Audio),
        _ => from_ext,
    }
}

fn page_to_item(page: Page) -> RawItem {
    let Some(info) = page.imageinfo.into_iter().next() else {
        return RawItem::default();
    };
    let object_name = info
        .extmetadata
        .get("ObjectName")
        .and_then(|m| m.value.as_ref())
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let file_title = page
        .title
        .map(|t| t.strip_prefix("File:").map(str::to_string).unwrap_or(t));

    RawItem {
        native_id: page.pageid.map(|id| id.to_string()),
        title: object_name.or(file_title),
        kind: infer_kind(info.mediatype.as_deref(), info.url.as_deref()),
        url: info.url,
        preview_url: info.thumburl,
        size_bytes: info.size,
    }
}

pub struct WikimediaAdapter {
    client: Client,
    api_url: String,
}

impl WikimediaAdapter {
    pub fn new(client: Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.to_string(),
        }
    }
}

#[async_trait]
impl SourceAdapter for WikimediaAdapter {
    fn id(&self) -> &str {
        "wikimedia"
    }


    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<RawItem>, AdapterError> {
        let limit = request.limit.to_string();
        let mut call = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", request.query),
                ("gsrnamespace", "6"),
                ("gsrlimit", limit.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url|mediatype|size|extmetadata|mime"),
                ("iilimit", "1"),
                ("iiurlwidth", PREVIEW_WIDTH),
                ("utf8", "1"),
            ])
            .timeout(request.timeout);
        if let Some(token) = request.credential {
            call = call.bearer_auth(token);
        }

        let response: ApiResponse = fetch_json(call, "wikimedia").await?;
        if let Some(error) = response.error {
            return Err(error.into_adapter_error());
        }

        let mut pages: Vec<Page> = response
            .query
            .map(|q| q.pages.into_values().collect())
            .unwrap_or_default();
        pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));

        Ok(pages.into_iter().take(request.limit).map(page_to_item).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::query::MediaTypeFilter;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(credential: Option<&str>) -> SearchRequest<'_> {
        SearchRequest {
            query: "cat",
            media_type: MediaTypeFilter::All,
            limit: 5,
            timeout: Duration::from_secs(5),
            credential,
        }
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(infer_kind(Some("BITMAP"), Some("https://u.test/a.jpg")), Some(MediaKind::Image));
        assert_eq!(infer_kind(Some("BITMAP"), Some("https://u.test/a.gif")), Some(MediaKind::Gif));
        assert_eq!(infer_kind(Some("VIDEO"), Some("https://u.test/a.webm")), Some(MediaKind::Video));
        assert_eq!(infer_kind(None, Some("https://u.test/a.ogg")), Some(MediaKind::Audio));
        assert_eq!(infer_kind(Some("OFFICE"), Some("https://u.test/a.pdf")), None);
    }

    #[tokio::test]
    async fn test_pages_follow_search_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("gsrsearch", "cat"))
            .and(query_param("gsrnamespace", "6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"pages": {
                    "20": {
                        "pageid": 20, "title": "File:Second.png", "index": 2,
                        "imageinfo": [{"url": "https://upload.test/Second.png", "size": 10, "mediatype": "BITMAP"}]
                    },
                    "10": {
                        "pageid": 10, "title": "File:First.webm", "index": 1,
                        "imageinfo": [{
                            "url": "https://upload.test/First.webm", "size": 99, "mediatype": "VIDEO",
                            "thumburl": "https://upload.test/thumb/First.jpg",
                            "extmetadata": {"ObjectName": {"value": "A cat video"}}
                        }]
                    }
                }}
            })))
            .mount(&server)
            .await;

        let adapter = WikimediaAdapter::new(Client::new(), &format!("{}/w/api.php", server.uri()));
        let items = adapter.search(&request(None)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("A cat video"));
        assert_eq!(items[0].kind, Some(MediaKind::Video));
        assert_eq!(items[0].preview_url.as_deref(), Some("https://upload.test/thumb/First.jpg"));
        assert_eq!(items[1].title.as_deref(), Some("Second.png"));
        assert_eq!(items[1].native_id.as_deref(), Some("20"));
    }

    #[tokio::test]
    async fn test_token_is_sent_and_api_errors_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"code": "mwoauth-invalid-authorization", "info": "Invalid access token"}
            })))
            .mount(&server)
            .await;

        let adapter = WikimediaAdapter::new(Client::new(), &format!("{}/w/api.php", server.uri()));
        let err = adapter.search(&request(Some("tok"))).await.unwrap_err();
        assert_eq!(err.kind, SearchErrorKind::AuthError);
        assert!(err.message.contains("Invalid access token"));
    }

    #[tokio::test]
    async fn test_no_pages_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"batchcomplete": ""})))
            .mount(&server)
            .await;

        let adapter = WikimediaAdapter::new(Client::new(), &format!("{}/w/api.php", server.uri()));
        assert!(adapter.search(&request(None)).await.unwrap().is_empty());
    }
}
