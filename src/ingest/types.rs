// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One item exactly as a mirror served it. Keys differ between providers.
pub type RawItem = serde_json::Map<String, serde_json::Value>;

pub const PLATFORM_BASE: &str = "https://x.com";

/// Text used when a mirror gives us nothing to show.
pub const NO_TEXT: &str = "no text";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishedAt {
    At(DateTime<Utc>),
    /// Date missing or in no format we know. Treated as "now" when filtering,
    /// so an ambiguous date never drops a post.
    Unparsed,
}

impl PublishedAt {
    /// Resolve against the run clock.
    pub fn or_now(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            PublishedAt::At(ts) => ts,
            PublishedAt::Unparsed => now,
        }
    }
}

impl fmt::Display for PublishedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedAt::At(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M UTC")),
            PublishedAt::Unparsed => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPost {
    pub id: String,
    pub text: String,
    pub reference_url: String, // always {PLATFORM_BASE}/{handle}/status/{id}
    pub published_at: PublishedAt,
    pub metrics: PostMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorKind {
    Api,
    Html,
    Rss,
}

impl MirrorKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "apify" => Some(MirrorKind::Api),
            "html" | "nitter" => Some(MirrorKind::Html),
            "rss" => Some(MirrorKind::Rss),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MirrorKind::Api => "api",
            MirrorKind::Html => "html",
            MirrorKind::Rss => "rss",
        }
    }
}

/// Where to fetch from and how. Order in a list is priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MirrorEndpoint {
    pub kind: MirrorKind,
    pub base: String,
}

impl MirrorEndpoint {
    pub fn new(kind: MirrorKind, base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            kind,
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }
}

impl fmt::Display for MirrorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.as_str(), self.base)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed payload from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("mirror {0} needs an API token")]
    MissingToken(String),
}

#[async_trait::async_trait]
pub trait MirrorClient: Send + Sync {
    async fn fetch(&self, handle: &str) -> Result<Vec<RawItem>, FetchError>;
    fn endpoint(&self) -> &MirrorEndpoint;

    fn name(&self) -> String {
        self.endpoint().to_string()
    }
}
