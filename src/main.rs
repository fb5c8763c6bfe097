//! Binary entrypoint.
//! One run: fetch recent posts for the configured handle, screenshot each,
//! email the captures to the operator, delete the captures.

use std::process::ExitCode;

use post_snapshot_mailer::capture::{CaptureEngine, CaptureSettings};
use post_snapshot_mailer::notify::EmailSender;
use post_snapshot_mailer::{init_tracing, run_once, BotConfig, RunSettings};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match BotConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "configuration error, aborting");
            eprintln!("ERROR: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        handle = %cfg.source.handle,
        lookback_hours = cfg.lookback_hours,
        mirrors = cfg.source.mirrors.len(),
        "post snapshot run starting"
    );

    let mirrors = cfg.source.build_mirrors();
    let mailer = match EmailSender::from_config(&cfg) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "mail transport setup failed, aborting");
            return ExitCode::FAILURE;
        }
    };

    let engine = CaptureEngine::new(launcher(), CaptureSettings::default());
    let settings = RunSettings::from_config(&cfg);

    match run_once(&settings, &mirrors, &engine, &mailer).await {
        Ok(summary) => {
            info!(
                posts = summary.posts,
                captured = summary.captured,
                delivered = ?summary.delivered,
                "run finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "browser")]
fn launcher() -> Box<dyn post_snapshot_mailer::capture::BrowserLauncher> {
    Box::new(post_snapshot_mailer::capture::chromium::ChromiumLauncher::from_env())
}

#[cfg(not(feature = "browser"))]
fn launcher() -> Box<dyn post_snapshot_mailer::capture::BrowserLauncher> {
    use async_trait::async_trait;
    use post_snapshot_mailer::capture::{BrowserLauncher, BrowserSession, CaptureError};

    struct Unavailable;

    #[async_trait]
    impl BrowserLauncher for Unavailable {
        async fn launch(
            &self,
            _settings: &CaptureSettings,
        ) -> Result<Box<dyn BrowserSession>, CaptureError> {
            Err(CaptureError::Launch(
                "built without the `browser` feature".into(),
            ))
        }
    }

    Box::new(Unavailable)
}
