// src/ingest/providers/nitter_html.rs
//! Unstructured fetch: scrape a Nitter-style timeline page.
//!
//! Markup is not a contract. When nothing matches we return an empty list and
//! let the coordinator move on to the next mirror.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};

use super::{http_client, read_ok_text, status_id_from_link, SCRAPE_TIMEOUT};
use crate::ingest::types::{FetchError, MirrorClient, MirrorEndpoint, RawItem};

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse(".timeline-item").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.tweet-link").unwrap());
static CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse(".tweet-content").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse(".tweet-date a").unwrap());
static STAT: Lazy<Selector> = Lazy::new(|| Selector::parse(".tweet-stat").unwrap());
static ICON: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"span[class^="icon-"]"#).unwrap());

pub struct NitterHtmlMirror {
    endpoint: MirrorEndpoint,
    client: Client,
}

impl NitterHtmlMirror {
    pub fn new(endpoint: MirrorEndpoint) -> Result<Self, FetchError> {
        Ok(Self {
            endpoint,
            client: http_client(SCRAPE_TIMEOUT)?,
        })
    }

    pub fn timeline_url(&self, handle: &str) -> String {
        format!("{}/{}", self.endpoint.base, handle)
    }

    /// Every `.timeline-item` with a status link becomes one raw item.
    pub fn parse_timeline(html: &str) -> Vec<RawItem> {
        let doc = Html::parse_document(html);
        doc.select(&ITEM).filter_map(parse_block).collect()
    }
}

fn parse_block(block: ElementRef<'_>) -> Option<RawItem> {
    let link = block
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .or_else(|| {
            block
                .select(&DATE)
                .next()
                .and_then(|a| a.value().attr("href"))
        })?;
    let id = status_id_from_link(link)?;

    let mut item = RawItem::new();
    item.insert("id".into(), Value::String(id));
    item.insert("link".into(), Value::String(link.to_string()));

    if let Some(content) = block.select(&CONTENT).next() {
        let text = content.text().collect::<Vec<_>>().join(" ");
        item.insert("text".into(), Value::String(text));
    }
    if let Some(date) = block
        .select(&DATE)
        .next()
        .and_then(|a| a.value().attr("title"))
    {
        item.insert("date".into(), Value::String(date.to_string()));
    }

    for stat in block.select(&STAT) {
        let Some(icon) = stat
            .select(&ICON)
            .next()
            .and_then(|s| s.value().classes().find(|c| c.starts_with("icon-")))
        else {
            continue;
        };
        let key = match icon {
            "icon-comment" => "replies",
            "icon-retweet" => "retweets",
            "icon-heart" => "likes",
            _ => continue,
        };
        let count = stat.text().collect::<String>();
        item.insert(key.into(), json!(count.trim()));
    }

    Some(item)
}

#[async_trait]
impl MirrorClient for NitterHtmlMirror {
    async fn fetch(&self, handle: &str) -> Result<Vec<RawItem>, FetchError> {
        let url = self.timeline_url(handle);
        let body = read_ok_text(&url, self.client.get(&url)).await?;
        let items = Self::parse_timeline(&body);
        if items.is_empty() {
            tracing::debug!(mirror = %self.endpoint, bytes = body.len(), "no timeline blocks matched");
        }
        Ok(items)
    }

    fn endpoint(&self) -> &MirrorEndpoint {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_without_status_link_is_skipped() {
        let html = r#"
            <div class="timeline-item"><div class="tweet-content">orphan</div></div>
            <div class="timeline-item show-more"><a href="/acme?cursor=x">Load more</a></div>
        "#;
        assert!(NitterHtmlMirror::parse_timeline(html).is_empty());
    }

    #[test]
    fn falls_back_to_date_anchor_for_link() {
        let html = r#"
            <div class="timeline-item">
              <span class="tweet-date"><a href="/acme/status/55#m" title="Oct 19, 2026 · 3:04 PM UTC">1h</a></span>
            </div>
        "#;
        let items = NitterHtmlMirror::parse_timeline(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "55");
        assert_eq!(items[0]["date"], "Oct 19, 2026 · 3:04 PM UTC");
    }
}
