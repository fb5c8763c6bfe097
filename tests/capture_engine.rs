// tests/capture_engine.rs
// Capture engine against scripted browser doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use post_snapshot_mailer::capture::{
    BrowserLauncher, BrowserSession, CaptureEngine, CaptureError, CaptureMode, CaptureSettings,
};

#[derive(Clone, Copy)]
enum Element {
    Present,
    Absent,
    Empty,
    Broken,
}

#[derive(Clone, Copy)]
struct Script {
    launch_fails: bool,
    nav_fails: bool,
    nav_hangs: bool,
    element: Element,
    viewport_empty: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            launch_fails: false,
            nav_fails: false,
            nav_hangs: false,
            element: Element::Present,
            viewport_empty: false,
        }
    }
}

#[derive(Default)]
struct Counters {
    launches: AtomicUsize,
    closes: AtomicUsize,
    element_probes: AtomicUsize,
}

struct FakeLauncher {
    script: Script,
    counters: Arc<Counters>,
}

struct FakeSession {
    script: Script,
    counters: Arc<Counters>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(
        &self,
        _settings: &CaptureSettings,
    ) -> Result<Box<dyn BrowserSession>, CaptureError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        if self.script.launch_fails {
            return Err(CaptureError::Launch("no chrome binary".into()));
        }
        Ok(Box::new(FakeSession {
            script: self.script,
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), CaptureError> {
        if self.script.nav_hangs {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.script.nav_fails {
            return Err(CaptureError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".into(),
            });
        }
        Ok(())
    }

    async fn capture_element(&mut self, _selector: &str) -> Result<Option<Vec<u8>>, CaptureError> {
        self.counters.element_probes.fetch_add(1, Ordering::SeqCst);
        match self.script.element {
            Element::Present => Ok(Some(b"element-png".to_vec())),
            Element::Absent => Ok(None),
            Element::Empty => Ok(Some(Vec::new())),
            Element::Broken => Err(CaptureError::Capture("node detached".into())),
        }
    }

    async fn capture_viewport(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.script.viewport_empty {
            Ok(Vec::new())
        } else {
            Ok(b"viewport-png".to_vec())
        }
    }

    async fn close(self: Box<Self>) -> Result<(), CaptureError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn engine(script: Script) -> (CaptureEngine, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let launcher = FakeLauncher {
        script,
        counters: counters.clone(),
    };
    let settings = CaptureSettings {
        navigation_timeout: Duration::from_millis(200),
        settle_delay: Duration::ZERO,
        ..CaptureSettings::default()
    };
    (CaptureEngine::new(Box::new(launcher), settings), counters)
}

const URL: &str = "https://x.com/acme/status/42";

#[tokio::test]
async fn content_element_is_captured_when_present() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("tweet_1_42.png");
    let (engine, counters) = engine(Script::default());

    let artifact = engine.try_capture(URL, &target).await.unwrap();
    assert_eq!(artifact.mode, CaptureMode::Targeted);
    assert_eq!(artifact.filename, "tweet_1_42.png");
    assert_eq!(std::fs::read(&target).unwrap(), b"element-png");
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn absent_element_falls_back_to_viewport() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("shot.png");
    let (engine, counters) = engine(Script {
        element: Element::Absent,
        ..Script::default()
    });

    let artifact = engine.try_capture(URL, &target).await.unwrap();
    assert_eq!(artifact.mode, CaptureMode::Viewport);
    assert!(!std::fs::read(&target).unwrap().is_empty());
    // every selector was tried before giving up
    assert_eq!(
        counters.element_probes.load(Ordering::SeqCst),
        engine.settings().content_selectors.len()
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn broken_or_empty_element_capture_falls_back() {
    for element in [Element::Broken, Element::Empty] {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("shot.png");
        let (engine, counters) = engine(Script {
            element,
            ..Script::default()
        });
        let artifact = engine.try_capture(URL, &target).await.unwrap();
        assert_eq!(artifact.mode, CaptureMode::Viewport);
        assert_eq!(artifact.bytes, b"viewport-png");
        assert_eq!(counters.element_probes.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn navigation_failure_closes_session_once() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("shot.png");
    let (engine, counters) = engine(Script {
        nav_fails: true,
        ..Script::default()
    });

    assert!(!engine.capture(URL, &target).await);
    assert!(!target.exists());
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn navigation_timeout_is_a_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("shot.png");
    let (engine, counters) = engine(Script {
        nav_hangs: true,
        ..Script::default()
    });

    let err = engine.try_capture(URL, &target).await.unwrap_err();
    assert!(matches!(err, CaptureError::Navigation { .. }));
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_viewport_is_a_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("shot.png");
    let (engine, counters) = engine(Script {
        element: Element::Absent,
        viewport_empty: true,
        ..Script::default()
    });

    assert!(!engine.capture(URL, &target).await);
    assert!(!target.exists());
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn launch_failure_never_closes() {
    let tmp = tempfile::tempdir().unwrap();
    let target = tmp.path().join("shot.png");
    let (engine, counters) = engine(Script {
        launch_fails: true,
        ..Script::default()
    });

    assert!(!engine.capture(URL, &target).await);
    assert_eq!(counters.launches.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn each_capture_uses_a_fresh_session() {
    let tmp = tempfile::tempdir().unwrap();
    let (engine, counters) = engine(Script::default());
    for n in 1..=3 {
        let target = tmp.path().join(format!("tweet_{n}_x.png"));
        assert!(engine.capture(URL, &target).await);
    }
    assert_eq!(counters.launches.load(Ordering::SeqCst), 3);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 3);
}
