// src/config/mirrors.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::providers::apify::DEFAULT_APIFY_URL;
use crate::ingest::types::{MirrorEndpoint, MirrorKind};

pub const ENV_MIRRORS: &str = "MIRRORS";
pub const ENV_MIRRORS_PATH: &str = "MIRRORS_CONFIG_PATH";

pub const DEFAULT_SCRAPE_MIRRORS: &[(MirrorKind, &str)] = &[
    (MirrorKind::Html, "https://nitter.net"),
    (MirrorKind::Rss, "https://nitter.net"),
    (MirrorKind::Html, "https://nitter.poast.org"),
];

#[derive(Debug, Deserialize)]
struct MirrorEntry {
    kind: String,
    #[serde(alias = "url")]
    base: String,
}

/// Inline form: `html=https://a,rss=https://b`. Whitespace and empty entries
/// are ignored.
pub fn parse_inline(s: &str) -> Result<Vec<MirrorEndpoint>> {
    let mut out = Vec::new();
    for part in s.split([',', ';', '\n']) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (kind, base) = part
            .split_once('=')
            .ok_or_else(|| anyhow!("mirror entry {part:?} is not kind=url"))?;
        out.push(endpoint(kind, base)?);
    }
    Ok(clean_list(out))
}

fn endpoint(kind: &str, base: &str) -> Result<MirrorEndpoint> {
    let kind = MirrorKind::parse(kind).ok_or_else(|| anyhow!("unknown mirror kind {kind:?}"))?;
    let base = base.trim();
    if base.is_empty() {
        return Err(anyhow!("mirror of kind {} has an empty url", kind.as_str()));
    }
    Ok(MirrorEndpoint::new(kind, base))
}

/// Load a mirror list file. Supports TOML (`[[mirror]]` tables) or a JSON array.
pub fn load_mirrors_from(path: &Path) -> Result<Vec<MirrorEndpoint>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading mirror list from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_mirror_file(&content, &ext)
}

fn parse_mirror_file(s: &str, hint_ext: &str) -> Result<Vec<MirrorEndpoint>> {
    let entries = if hint_ext == "json" {
        parse_json(s).or_else(|_| parse_toml(s))
    } else {
        parse_toml(s).or_else(|_| parse_json(s))
    }
    .map_err(|_| anyhow!("unsupported mirror list format"))?;

    let list = entries
        .into_iter()
        .map(|e| endpoint(&e.kind, &e.base))
        .collect::<Result<Vec<_>>>()?;
    Ok(clean_list(list))
}

fn parse_toml(s: &str) -> Result<Vec<MirrorEntry>> {
    #[derive(Deserialize)]
    struct TomlMirrors {
        mirror: Vec<MirrorEntry>,
    }
    let v: TomlMirrors = toml::from_str(s)?;
    Ok(v.mirror)
}

fn parse_json(s: &str) -> Result<Vec<MirrorEntry>> {
    Ok(serde_json::from_str(s)?)
}

/// Dedupe keeping first position; priority is order.
fn clean_list(items: Vec<MirrorEndpoint>) -> Vec<MirrorEndpoint> {
    let mut out: Vec<MirrorEndpoint> = Vec::with_capacity(items.len());
    for it in items {
        if !out.contains(&it) {
            out.push(it);
        }
    }
    out
}

pub fn default_mirrors(has_api_token: bool) -> Vec<MirrorEndpoint> {
    let mut out = Vec::new();
    if has_api_token {
        out.push(MirrorEndpoint::new(MirrorKind::Api, DEFAULT_APIFY_URL));
    }
    out.extend(
        DEFAULT_SCRAPE_MIRRORS
            .iter()
            .map(|(kind, base)| MirrorEndpoint::new(*kind, *base)),
    );
    out
}

/// Resolution order:
/// 1) $MIRRORS inline list
/// 2) $MIRRORS_CONFIG_PATH (must exist)
/// 3) config/mirrors.toml
/// 4) config/mirrors.json
/// 5) built-in defaults
pub fn resolve_mirrors(
    lookup: &dyn Fn(&str) -> Option<String>,
    has_api_token: bool,
) -> Result<Vec<MirrorEndpoint>> {
    if let Some(inline) = lookup(ENV_MIRRORS).filter(|s| !s.trim().is_empty()) {
        let list = parse_inline(&inline)?;
        if !list.is_empty() {
            return Ok(list);
        }
    }
    if let Some(p) = lookup(ENV_MIRRORS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_mirrors_from(&pb);
        }
        return Err(anyhow!("{ENV_MIRRORS_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/mirrors.toml");
    if toml_p.exists() {
        return load_mirrors_from(&toml_p);
    }
    let json_p = PathBuf::from("config/mirrors.json");
    if json_p.exists() {
        return load_mirrors_from(&json_p);
    }
    Ok(default_mirrors(has_api_token))
}
