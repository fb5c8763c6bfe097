// src/ingest/providers/mod.rs
//! Mirror client strategies. Each one is bound to a single `MirrorEndpoint`
//! and turns whatever that endpoint serves into `RawItem`s.

pub mod apify;
pub mod nitter_html;
pub mod nitter_rss;

use std::time::Duration;

use metrics::histogram;
use reqwest::{Client, Response};
use scraper::Html;

use crate::ingest::types::{FetchError, MirrorClient, MirrorEndpoint, MirrorKind};

pub use apify::ApifyMirror;
pub use nitter_html::NitterHtmlMirror;
pub use nitter_rss::NitterRssMirror;

/// Desktop Chrome. Some front-ends silently serve empty pages to unknown agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

pub const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

/// Every mirror request carries `BROWSER_USER_AGENT`; there is no fallback client.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)
}

/// Build the strategy matching `endpoint.kind`.
pub fn build_mirror(
    endpoint: MirrorEndpoint,
    api_token: Option<&str>,
) -> Result<Box<dyn MirrorClient>, FetchError> {
    Ok(match endpoint.kind {
        MirrorKind::Api => {
            let token = api_token
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| FetchError::MissingToken(endpoint.to_string()))?;
            Box::new(ApifyMirror::new(endpoint, token)?)
        }
        MirrorKind::Html => Box::new(NitterHtmlMirror::new(endpoint)?),
        MirrorKind::Rss => Box::new(NitterRssMirror::new(endpoint)?),
    })
}

/// Send, require 2xx, read the body as text.
pub(crate) async fn read_ok_text(
    url: &str,
    req: reqwest::RequestBuilder,
) -> Result<String, FetchError> {
    let t0 = std::time::Instant::now();
    let resp = req.send().await.map_err(|source| FetchError::Network {
        url: url.to_string(),
        source,
    })?;
    let resp = ensure_success(url, resp)?;
    let body = resp.text().await.map_err(|source| FetchError::Network {
        url: url.to_string(),
        source,
    })?;
    histogram!("mirror_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(body)
}

fn ensure_success(url: &str, resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Visible text of an HTML fragment. Entities come back decoded and tags are
/// dropped by the parser, so a literal `<` in the text survives.
pub fn html_to_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `/acme/status/123#m` or `https://nitter.net/acme/status/123` -> `123`.
pub fn status_id_from_link(link: &str) -> Option<String> {
    let (_, rest) = link.split_once("/status/")?;
    let id: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    (!id.is_empty()).then_some(id)
}
