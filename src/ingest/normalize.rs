// src/ingest/normalize.rs
//! Raw mirror items -> `CanonicalPost`.
//!
//! Every logical field is looked up through a declared, ordered list of key
//! synonyms; the first key holding a usable value wins.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::ingest::types::{
    CanonicalPost, PostMetrics, PublishedAt, RawItem, NO_TEXT, PLATFORM_BASE,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("item has none of the identifier keys {0:?}")]
    MissingIdentifier(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSynonyms {
    pub field: &'static str,
    pub keys: &'static [&'static str],
}

pub const ID: FieldSynonyms = FieldSynonyms {
    field: "id",
    keys: &["id", "id_str", "tweetId", "tweet_id", "rest_id", "statusId"],
};
pub const TEXT: FieldSynonyms = FieldSynonyms {
    field: "text",
    keys: &["text", "full_text", "content", "tweet_text"],
};
pub const DATE: FieldSynonyms = FieldSynonyms {
    field: "date",
    keys: &["createdAt", "created_at", "timestamp", "date", "pubDate"],
};
pub const LIKES: FieldSynonyms = FieldSynonyms {
    field: "likes",
    keys: &["likeCount", "likes", "favorite_count", "favoriteCount"],
};
pub const REPOSTS: FieldSynonyms = FieldSynonyms {
    field: "reposts",
    keys: &["retweetCount", "retweets", "retweet_count", "reposts"],
};
pub const REPLIES: FieldSynonyms = FieldSynonyms {
    field: "replies",
    keys: &["replyCount", "replies", "reply_count"],
};

pub const FIELD_TABLE: &[FieldSynonyms] = &[ID, TEXT, DATE, LIKES, REPOSTS, REPLIES];

/// Classic platform API format, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
pub const PLATFORM_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";
/// Nitter tooltip format once the trailing zone name is removed,
/// e.g. `Oct 19, 2026 · 3:04 PM`.
const NITTER_DATE_FORMAT: &str = "%b %d, %Y · %I:%M %p";

const TEXT_CAP_CHARS: usize = 4_000;

impl FieldSynonyms {
    /// First synonym whose value is usable (non-null, non-blank string).
    pub fn probe<'a>(&self, raw: &'a RawItem) -> Option<(&'static str, &'a Value)> {
        self.keys.iter().find_map(|k| {
            let v = raw.get(*k)?;
            let usable = match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            };
            usable.then_some((*k, v))
        })
    }
}

pub fn reference_url(handle: &str, id: &str) -> String {
    format!("{PLATFORM_BASE}/{handle}/status/{id}")
}

/// Build a canonical post. Pure: same input, same output.
pub fn normalize(raw: &RawItem, handle: &str) -> Result<CanonicalPost, NormalizeError> {
    let id = ID
        .probe(raw)
        .and_then(|(_, v)| scalar_to_string(v))
        .ok_or(NormalizeError::MissingIdentifier(ID.keys))?;

    let text = TEXT
        .probe(raw)
        .and_then(|(_, v)| v.as_str())
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_TEXT.to_string());

    let published_at = DATE
        .probe(raw)
        .map(|(_, v)| parse_published(v))
        .unwrap_or(PublishedAt::Unparsed);

    let metrics = PostMetrics {
        likes: count_of(raw, &LIKES),
        reposts: count_of(raw, &REPOSTS),
        replies: count_of(raw, &REPLIES),
    };

    Ok(CanonicalPost {
        reference_url: reference_url(handle, &id),
        id,
        text,
        published_at,
        metrics,
    })
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count_of(raw: &RawItem, syn: &FieldSynonyms) -> u64 {
    match syn.probe(raw).map(|(_, v)| v) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().replace(',', "").parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn parse_published(v: &Value) -> PublishedAt {
    let parsed = match v {
        Value::Number(n) => n.as_i64().and_then(from_epoch),
        Value::String(s) => parse_date_str(s),
        _ => None,
    };
    parsed.map(PublishedAt::At).unwrap_or(PublishedAt::Unparsed)
}

/// Tries the platform format first, then the other shapes mirrors emit.
pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_str(s, PLATFORM_DATE_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(bare) = s.strip_suffix("UTC").map(str::trim_end) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(bare, NITTER_DATE_FORMAT) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }
    None
}

fn from_epoch(n: i64) -> Option<DateTime<Utc>> {
    if n >= 1_000_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

/// Decode entities and fold whitespace. Input is plain text: strategies that
/// read markup flatten it before it gets here, so `<` is never a tag.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > TEXT_CAP_CHARS {
        out = out.chars().take(TEXT_CAP_CHARS).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    fn raw(v: Value) -> RawItem {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn numeric_id_is_rendered_in_decimal() {
        let p = normalize(&raw(json!({"rest_id": 1849000000000000000u64})), "acme").unwrap();
        assert_eq!(p.id, "1849000000000000000");
        assert_eq!(p.reference_url, "https://x.com/acme/status/1849000000000000000");
    }

    #[test]
    fn blank_id_falls_through_to_next_synonym() {
        let p = normalize(&raw(json!({"id": "  ", "id_str": "7"})), "acme").unwrap();
        assert_eq!(p.id, "7");
    }

    #[test]
    fn platform_date_format_parses() {
        let ts = parse_date_str("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(ts.year(), 2018);
        assert_eq!(ts.timestamp(), 1_539_202_764);
    }

    #[test]
    fn nitter_tooltip_format_parses() {
        let ts = parse_date_str("Oct 19, 2026 · 3:04 PM UTC").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-10-19T15:04:00+00:00");
    }

    #[test]
    fn epoch_millis_and_seconds() {
        assert_eq!(
            parse_published(&json!(1_700_000_000)),
            parse_published(&json!(1_700_000_000_000i64))
        );
    }

    #[test]
    fn garbage_date_is_unparsed() {
        assert_eq!(parse_published(&json!("yesterday-ish")), PublishedAt::Unparsed);
        assert_eq!(parse_published(&json!(true)), PublishedAt::Unparsed);
    }

    #[test]
    fn counts_accept_strings_with_separators() {
        let p = normalize(
            &raw(json!({"id": "1", "likes": "1,204", "retweetCount": 3.0, "replies": null})),
            "acme",
        )
        .unwrap();
        assert_eq!(p.metrics.likes, 1204);
        assert_eq!(p.metrics.reposts, 3);
        assert_eq!(p.metrics.replies, 0);
    }

    #[test]
    fn clean_text_decodes_and_folds_whitespace() {
        assert_eq!(clean_text("Hello&nbsp;world\n\n &amp; more"), "Hello world & more");
        assert_eq!(clean_text("1 < 2"), "1 < 2");
    }

    #[test]
    fn angle_brackets_in_post_text_survive() {
        assert_eq!(
            clean_text("if a<b and c>d we ship Vec<u8> today"),
            "if a<b and c>d we ship Vec<u8> today"
        );
        assert_eq!(clean_text("generic Vec&lt;u8&gt; rocks"), "generic Vec<u8> rocks");
    }
}
