// src/ingest/providers/apify.rs
//! Structured fetch through the Apify tweet-scraper actor (synchronous run,
//! dataset items returned in the response body).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{http_client, read_ok_text};
use crate::ingest::types::{FetchError, MirrorClient, MirrorEndpoint, RawItem};

pub const DEFAULT_APIFY_URL: &str =
    "https://api.apify.com/v2/acts/apidojo~tweet-scraper/run-sync-get-dataset-items";

/// Actor runs scrape on demand and are slow.
pub const APIFY_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_DESIRED: u32 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActorInput<'a> {
    handles: [&'a str; 1],
    tweets_desired: u32,
    proxy_config: ProxyConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyConfig {
    use_apify_proxy: bool,
}

pub struct ApifyMirror {
    endpoint: MirrorEndpoint,
    token: String,
    desired: u32,
    client: Client,
}

impl ApifyMirror {
    pub fn new(endpoint: MirrorEndpoint, token: &str) -> Result<Self, FetchError> {
        Ok(Self {
            endpoint,
            token: token.to_string(),
            desired: DEFAULT_DESIRED,
            client: http_client(APIFY_TIMEOUT)?,
        })
    }

    /// Items requested per run; each one costs actor quota.
    pub fn with_desired(mut self, n: u32) -> Self {
        self.desired = n.max(1);
        self
    }

    pub fn desired(&self) -> u32 {
        self.desired
    }

    /// Dataset items must be a JSON array of objects; anything else in the
    /// array is skipped.
    pub fn parse_items(url: &str, body: &str) -> Result<Vec<RawItem>, FetchError> {
        let value: Value = serde_json::from_str(body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let Value::Array(items) = value else {
            return Err(FetchError::Malformed {
                url: url.to_string(),
                reason: "expected a JSON array of dataset items".to_string(),
            });
        };
        Ok(items
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl MirrorClient for ApifyMirror {
    async fn fetch(&self, handle: &str) -> Result<Vec<RawItem>, FetchError> {
        let url = self.endpoint.base.as_str();
        let input = ActorInput {
            handles: [handle],
            tweets_desired: self.desired,
            proxy_config: ProxyConfig {
                use_apify_proxy: true,
            },
        };
        let req = self
            .client
            .post(url)
            .query(&[("token", self.token.as_str())])
            .json(&input);
        let body = read_ok_text(url, req).await?;
        Self::parse_items(url, &body)
    }

    fn endpoint(&self) -> &MirrorEndpoint {
        &self.endpoint
    }
}
