//! Morbotron screencap search (public JSON API)

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::adapters::{base, fetch_json};
use crate::core::error::AdapterError;
use crate::core::item::RawItem;
use crate::core::query::MediaKind;
use crate::core::source::{SearchRequest, SourceAdapter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Frame {
    episode: Option<String>,
    /// Usually a number, occasionally a string; 0 is valid
    timestamp: Option<Value>,
}

impl Frame {
    fn timestamp(&self) -> Option<String> {
        match self.timestamp.as_ref()? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

pub struct MorbotronAdapter {
    client: Client,
    base_url: String,
}

impl MorbotronAdapter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base(base_url),
        }
    }

    fn to_raw_item(&self, frame: &Frame) -> RawItem {
        let episode = frame.episode.as_deref().filter(|e| !e.is_empty());
        match (episode, frame.timestamp()) {
            (Some(episode), Some(ts)) => RawItem::new(format!("{}/img/{episode}/{ts}.jpg", self.base_url))
                .id(format!("{episode}_{ts}"))
                .title(format!("Morbotron {episode} @ {ts}"))
                .kind(MediaKind::Image)
                .preview(Some(format!("{}/img/{episode}/{ts}/medium.jpg", self.base_url))),
            // left for the normalizer to skip and count
            _ => RawItem {
                kind: Some(MediaKind::Image),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl SourceAdapter for MorbotronAdapter {
    fn id(&self) -> &str {
        "morbotron"
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<RawItem>, AdapterError> {
        let call = self
            .client
            .get(format!("{}/api/search", self.base_url))
            .query(&[("q", request.query)])
            .timeout(request.timeout);

        let frames: Vec<Frame> = fetch_json(call, "morbotron").await?;
        Ok(frames
            .iter()
            .take(request.limit)
            .map(|frame| self.to_raw_item(frame))
            .collect())
    }
}
