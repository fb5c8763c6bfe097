// src/ingest/providers/nitter_rss.rs
use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{html_to_text, http_client, read_ok_text, status_id_from_link, SCRAPE_TIMEOUT};
use crate::ingest::types::{FetchError, MirrorClient, MirrorEndpoint, RawItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// `{base}/{handle}/rss` feed served by Nitter instances.
pub struct NitterRssMirror {
    endpoint: MirrorEndpoint,
    client: Client,
}

impl NitterRssMirror {
    pub fn new(endpoint: MirrorEndpoint) -> Result<Self, FetchError> {
        Ok(Self {
            endpoint,
            client: http_client(SCRAPE_TIMEOUT)?,
        })
    }

    pub fn feed_url(&self, handle: &str) -> String {
        format!("{}/{}/rss", self.endpoint.base, handle)
    }

    pub fn parse_feed(url: &str, xml: &str) -> Result<Vec<RawItem>, FetchError> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let link = it.link.or(it.guid);
            let Some(id) = link.as_deref().and_then(status_id_from_link) else {
                continue;
            };
            let mut raw = RawItem::new();
            raw.insert("id".into(), Value::String(id));
            if let Some(link) = link {
                raw.insert("link".into(), Value::String(link));
            }
            if let Some(title) = it.title {
                raw.insert("text".into(), Value::String(title));
            }
            if let Some(desc) = it.description {
                raw.insert("content".into(), Value::String(html_to_text(&desc)));
            }
            if let Some(date) = it.pub_date {
                raw.insert("pubDate".into(), Value::String(date));
            }
            out.push(raw);
        }
        Ok(out)
    }
}

#[async_trait]
impl MirrorClient for NitterRssMirror {
    async fn fetch(&self, handle: &str) -> Result<Vec<RawItem>, FetchError> {
        let url = self.feed_url(handle);
        let body = read_ok_text(&url, self.client.get(&url)).await?;
        Self::parse_feed(&url, &body)
    }

    fn endpoint(&self) -> &MirrorEndpoint {
        &self.endpoint
    }
}

// Entities that are valid HTML but undeclared in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_channel_is_ok() {
        let xml = r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(NitterRssMirror::parse_feed("u", xml).unwrap().is_empty());
    }

    #[test]
    fn description_markup_is_flattened_to_text() {
        let xml = r#"<rss version="2.0"><channel><item>
            <description><![CDATA[<p>Generic Vec&lt;u8&gt; <b>rocks</b></p>]]></description>
            <link>https://n.test/acme/status/7#m</link>
        </item></channel></rss>"#;
        let items = NitterRssMirror::parse_feed("u", xml).unwrap();
        assert_eq!(items[0]["content"], "Generic Vec<u8>  rocks");
    }

    #[test]
    fn html_page_is_malformed() {
        let err = NitterRssMirror::parse_feed("u", "<html><body>rate limited</body></html>")
            .unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }
}
