//! Frinkiac screencap search (HTML scrape)

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::adapters::{base, fetch_text};
use crate::core::error::AdapterError;
use crate::core::item::RawItem;
use crate::core::query::MediaKind;
use crate::core::source::{absolutize, SearchRequest, SourceAdapter};

const MAX_TITLE_CHARS: usize = 80;

pub struct FrinkiacAdapter {
    client: Client,
    base_url: String,
}

impl FrinkiacAdapter {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base(base_url),
        }
    }
}

fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::parse(format!("bad selector '{css}': {e}")))
}

fn frame_title(subtitle: &str) -> String {
    let mut title: String = subtitle.chars().take(MAX_TITLE_CHARS).collect();
    if subtitle.chars().count() > MAX_TITLE_CHARS {
        title.push_str("...");
    }
    format!("Frinkiac: {title}")
}

/// Extract frames from a results page, at most `limit` of them
fn parse_results(html: &str, base_url: &str, query: &str, limit: usize) -> Result<Vec<RawItem>, AdapterError> {
    let document = Html::parse_document(html);
    let panel_sel = selector("div.frame-panel")?;
    let link_sel = selector("a[href]")?;
    let img_sel = selector("img.frame-image[src]")?;
    let subtitle_sel = selector(".caption-panel .subtitle-text")?;
    let caption_re = Regex::new(r"/caption/(S\d+E\d+)/(\d+)")
        .map_err(|e| AdapterError::parse(e.to_string()))?;

    let mut items = Vec::new();
    for panel in document.select(&panel_sel) {
        if items.len() >= limit {
            break;
        }
        let Some(href) = panel.select(&link_sel).next().and_then(|a| a.value().attr("href")) else {
            continue;
        };
        let Some(src) = panel.select(&img_sel).next().and_then(|img| img.value().attr("src")) else {
            continue;
        };
        let Some(caps) = caption_re.captures(href) else {
            continue;
        };

        let lines: Vec<String> = panel
            .select(&subtitle_sel)
            .map(|s| s.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let subtitle = if lines.is_empty() {
            query.to_string()
        } else {
            lines.join(" ")
        };

        let image_url = absolutize(base_url, src);
        items.push(
            RawItem {
                url: image_url.clone(),
                preview_url: image_url,
                ..Default::default()
            }
            .id(format!("{}_{}", &caps[1], &caps[2]))
            .title(frame_title(&subtitle))
            .kind(MediaKind::Image),
        );
    }
    Ok(items)
}

#[async_trait]
impl SourceAdapter for FrinkiacAdapter {
    fn id(&self) -> &str {
        "frinkiac"
    }

    async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<RawItem>, AdapterError> {
        let call = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("q", request.query)])
            .timeout(request.timeout);
        let html = fetch_text(call, "frinkiac").await?;
        parse_results(&html, &self.base_url, request.query, request.limit)
    }
}
