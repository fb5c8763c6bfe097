// src/pipeline.rs
//! One stateless run: acquire -> capture each post -> deliver -> clean up.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::counter;
use tracing::{error, info, warn};

use crate::capture::{ArtifactDir, CaptureEngine};
use crate::config::BotConfig;
use crate::ingest::acquire_recent;
use crate::ingest::types::MirrorClient;
use crate::notify::{Deliverer, DeliveryItem};

/// Pause between captures so the target site does not flag us as a bot.
pub const DEFAULT_CAPTURE_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub handle: String,
    pub lookback_hours: i64,
    pub artifact_parent: Option<PathBuf>,
    pub capture_pause: Duration,
}

impl RunSettings {
    pub fn from_config(cfg: &BotConfig) -> Self {
        Self {
            handle: cfg.source.handle.clone(),
            lookback_hours: cfg.lookback_hours,
            artifact_parent: cfg.artifact_dir.clone(),
            capture_pause: DEFAULT_CAPTURE_PAUSE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub posts: usize,
    pub captured: usize,
    /// `None` when delivery was not attempted.
    pub delivered: Option<bool>,
}

pub async fn run_once(
    settings: &RunSettings,
    mirrors: &[Box<dyn MirrorClient>],
    engine: &CaptureEngine,
    deliverer: &dyn Deliverer,
) -> Result<RunSummary> {
    let posts = acquire_recent(&settings.handle, settings.lookback_hours, mirrors).await;
    if posts.is_empty() {
        info!(handle = %settings.handle, "no recent posts, exiting");
        return Ok(RunSummary::default());
    }

    let dir = ArtifactDir::create(settings.artifact_parent.as_deref())
        .context("creating artifact directory")?;

    let total = posts.len();
    let mut items = Vec::with_capacity(total);
    for (i, post) in posts.into_iter().enumerate() {
        if i > 0 && !settings.capture_pause.is_zero() {
            tokio::time::sleep(settings.capture_pause).await;
        }
        let target = dir.target_for(i + 1, &post.id);
        info!(n = i + 1, total, url = %post.reference_url, "capturing");
        let artifact = match engine.try_capture(&post.reference_url, &target).await {
            Ok(a) => Some(a),
            Err(e) => {
                warn!(url = %post.reference_url, error = %e, "capture failed, continuing");
                counter!("capture_failed_total").increment(1);
                None
            }
        };
        items.push(DeliveryItem { post, artifact });
    }

    let captured = items.iter().filter(|i| i.artifact.is_some()).count();
    let delivered = if captured == 0 {
        warn!("no screenshots captured, skipping delivery");
        None
    } else {
        match deliverer.deliver(&settings.handle, &items).await {
            Ok(()) => Some(true),
            Err(e) => {
                error!(via = deliverer.name(), error = %e, "delivery failed");
                Some(false)
            }
        }
    };

    drop(items);
    if let Err(e) = dir.cleanup() {
        warn!(error = %e, "artifact directory cleanup incomplete");
    }

    Ok(RunSummary {
        posts: total,
        captured,
        delivered,
    })
}
