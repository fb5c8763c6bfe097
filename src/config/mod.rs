// src/config/mod.rs
//! Run configuration from the process environment (`.env` is loaded by the
//! binaries before this runs).

pub mod mirrors;

use std::path::PathBuf;

use thiserror::Error;

use crate::ingest::providers::build_mirror;
use crate::ingest::types::{MirrorClient, MirrorEndpoint};
use crate::ingest::LOOKBACK_HOURS;

pub const DEFAULT_HANDLE: &str = "elonmusk";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

pub const ENV_HANDLE: &str = "TWITTER_HANDLE";
pub const ENV_EMAIL: &str = "YOUR_EMAIL";
pub const ENV_EMAIL_PASSWORD: &str = "YOUR_EMAIL_PASSWORD";
pub const ENV_EMAIL_TO: &str = "EMAIL_TO";
pub const ENV_SMTP_HOST: &str = "SMTP_HOST";
pub const ENV_API_TOKEN: &str = "APIFY_API_TOKEN";
pub const ENV_ARTIFACT_DIR: &str = "ARTIFACT_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid mirror configuration: {0:#}")]
    Mirrors(anyhow::Error),
}

/// Where and what to fetch. Needs no credentials.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub handle: String,
    pub lookback_hours: i64,
    pub api_token: Option<String>,
    pub mirrors: Vec<MirrorEndpoint>,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub source: SourceConfig,
    pub email: String,
    pub email_password: String,
    pub email_to: String,
    pub smtp_host: String,
    pub artifact_dir: Option<PathBuf>,
    pub lookback_hours: i64,
}

fn non_empty(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `@Acme ` -> `Acme`.
pub fn clean_handle(raw: &str) -> String {
    raw.trim().trim_start_matches('@').trim().to_string()
}

impl SourceConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let handle = non_empty(lookup, ENV_HANDLE)
            .map(|h| clean_handle(&h))
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HANDLE.to_string());
        let api_token = non_empty(lookup, ENV_API_TOKEN);
        let mirrors = mirrors::resolve_mirrors(lookup, api_token.is_some())
            .map_err(ConfigError::Mirrors)?;

        Ok(Self {
            handle,
            lookback_hours: LOOKBACK_HOURS,
            api_token,
            mirrors,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }

    /// Instantiate clients in priority order. Entries that cannot be built
    /// (API without token) are skipped with a warning.
    pub fn build_mirrors(&self) -> Vec<Box<dyn MirrorClient>> {
        self.mirrors
            .iter()
            .filter_map(|ep| match build_mirror(ep.clone(), self.api_token.as_deref()) {
                Ok(m) => Some(m),
                Err(e) => {
                    tracing::warn!(mirror = %ep, error = %e, "mirror skipped");
                    None
                }
            })
            .collect()
    }
}

impl BotConfig {
    /// Fails before any network activity when credentials are missing.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let email = non_empty(lookup, ENV_EMAIL);
        let email_password = non_empty(lookup, ENV_EMAIL_PASSWORD);
        let (email, email_password) = match (email, email_password) {
            (Some(e), Some(p)) => (e, p),
            (e, p) => {
                let mut missing = Vec::new();
                if e.is_none() {
                    missing.push(ENV_EMAIL);
                }
                if p.is_none() {
                    missing.push(ENV_EMAIL_PASSWORD);
                }
                return Err(ConfigError::Missing(missing));
            }
        };

        let source = SourceConfig::from_lookup(lookup)?;
        Ok(Self {
            email_to: non_empty(lookup, ENV_EMAIL_TO).unwrap_or_else(|| email.clone()),
            smtp_host: non_empty(lookup, ENV_SMTP_HOST)
                .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            artifact_dir: non_empty(lookup, ENV_ARTIFACT_DIR).map(PathBuf::from),
            lookback_hours: source.lookback_hours,
            source,
            email,
            email_password,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|k| std::env::var(k).ok())
    }
}
