//! Fetch from every configured mirror (without stopping at the first) and
//! report what each one serves: item count, keys of the first item, which
//! synonym matched per field, and the post it normalizes to.

use post_snapshot_mailer::ingest::normalize::{normalize, FIELD_TABLE};
use post_snapshot_mailer::ingest::providers::{build_mirror, ApifyMirror};
use post_snapshot_mailer::ingest::types::{FetchError, MirrorClient, MirrorEndpoint, MirrorKind};
use post_snapshot_mailer::{init_tracing, SourceConfig};
use tracing::{info, warn};

/// A diagnostic actor run only needs a handful of items.
const PROBE_DESIRED: u32 = 5;

fn probe_client(
    endpoint: &MirrorEndpoint,
    token: Option<&str>,
) -> Result<Box<dyn MirrorClient>, FetchError> {
    match (endpoint.kind, token) {
        (MirrorKind::Api, Some(token)) => Ok(Box::new(
            ApifyMirror::new(endpoint.clone(), token)?.with_desired(PROBE_DESIRED),
        )),
        _ => build_mirror(endpoint.clone(), token),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let src = match SourceConfig::from_env() {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "configuration error");
            return;
        }
    };
    let token_state = if src.api_token.is_some() { "present" } else { "missing" };
    info!(handle = %src.handle, api_token = token_state, "probing mirrors");

    for endpoint in &src.mirrors {
        let mirror = match probe_client(endpoint, src.api_token.as_deref()) {
            Ok(m) => m,
            Err(e) => {
                warn!(mirror = %endpoint, error = %e, "mirror skipped");
                continue;
            }
        };
        let name = mirror.name();
        let items = match mirror.fetch(&src.handle).await {
            Ok(v) => v,
            Err(e) => {
                warn!(mirror = %name, error = %e, "fetch failed");
                continue;
            }
        };
        info!(mirror = %name, items = items.len(), "fetched");

        let Some(first) = items.first() else {
            continue;
        };
        let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
        keys.sort_unstable();
        info!(mirror = %name, ?keys, "first item keys");

        for syn in FIELD_TABLE {
            match syn.probe(first) {
                Some((key, value)) => {
                    info!(mirror = %name, field = syn.field, key, %value, "field found")
                }
                None => info!(mirror = %name, field = syn.field, tried = ?syn.keys, "field missing"),
            }
        }

        match normalize(first, &src.handle) {
            Ok(post) => info!(
                mirror = %name,
                id = %post.id,
                url = %post.reference_url,
                published = %post.published_at,
                "normalizes to"
            ),
            Err(e) => warn!(mirror = %name, error = %e, "first item rejected"),
        }
    }

    println!("mirror-probe done");
}
