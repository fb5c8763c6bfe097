// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod capture;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::config::{BotConfig, ConfigError, SourceConfig};
pub use crate::ingest::types::{CanonicalPost, MirrorClient, MirrorEndpoint, MirrorKind};
pub use crate::pipeline::{run_once, RunSettings, RunSummary};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact fmt logging filtered by `RUST_LOG` (default `info`).
/// Set `LOG_FORMAT=json` for one JSON object per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}
