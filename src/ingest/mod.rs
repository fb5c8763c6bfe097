// src/ingest/mod.rs
pub mod normalize;
pub mod providers;
pub mod types;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

use crate::ingest::normalize::normalize;
use crate::ingest::types::{CanonicalPost, MirrorClient};

/// Fixed lookback for a run.
pub const LOOKBACK_HOURS: i64 = 12;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "acquire_mirror_errors_total",
            "Mirror fetches that failed (network, status, payload)."
        );
        describe_counter!(
            "acquire_rejected_total",
            "Raw items dropped for lack of an identifier."
        );
        describe_counter!(
            "acquire_posts_total",
            "Posts returned by the winning mirror."
        );
        describe_histogram!("mirror_fetch_ms", "Mirror HTTP round trip in milliseconds.");
    });
}

/// Normalize a batch and keep posts at or after `threshold`.
/// Unparsed dates count as `now` and therefore pass.
pub fn normalize_and_filter(
    raw: &[types::RawItem],
    handle: &str,
    now: DateTime<Utc>,
    threshold: DateTime<Utc>,
) -> (Vec<CanonicalPost>, usize) {
    let mut rejected = 0usize;
    let mut kept = Vec::with_capacity(raw.len());
    for item in raw {
        match normalize(item, handle) {
            Ok(post) => {
                if post.published_at.or_now(now) >= threshold {
                    kept.push(post);
                }
            }
            Err(e) => {
                rejected += 1;
                tracing::debug!(error = %e, "raw item rejected");
            }
        }
    }
    (kept, rejected)
}

/// Walk `mirrors` in priority order and return the recent posts of the first
/// one that has any. An empty result means nothing to do, not a failure.
pub async fn acquire_recent(
    handle: &str,
    lookback_hours: i64,
    mirrors: &[Box<dyn MirrorClient>],
) -> Vec<CanonicalPost> {
    acquire_recent_at(Utc::now(), handle, lookback_hours, mirrors).await
}

pub async fn acquire_recent_at(
    now: DateTime<Utc>,
    handle: &str,
    lookback_hours: i64,
    mirrors: &[Box<dyn MirrorClient>],
) -> Vec<CanonicalPost> {
    ensure_metrics_described();
    let threshold = now - Duration::hours(lookback_hours);

    for mirror in mirrors {
        let name = mirror.name();
        let raw = match mirror.fetch(handle).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(mirror = %name, error = %e, "mirror fetch failed, trying next");
                counter!("acquire_mirror_errors_total").increment(1);
                continue;
            }
        };

        let (kept, rejected) = normalize_and_filter(&raw, handle, now, threshold);
        counter!("acquire_rejected_total").increment(rejected as u64);

        if kept.is_empty() {
            tracing::info!(
                mirror = %name,
                fetched = raw.len(),
                rejected,
                "no posts inside lookback window, trying next"
            );
            continue;
        }

        tracing::info!(
            mirror = %name,
            fetched = raw.len(),
            rejected,
            kept = kept.len(),
            %threshold,
            "mirror yielded recent posts"
        );
        counter!("acquire_posts_total").increment(kept.len() as u64);
        return kept;
    }

    tracing::info!(%handle, lookback_hours, "all mirrors exhausted, nothing to do");
    Vec::new()
}
