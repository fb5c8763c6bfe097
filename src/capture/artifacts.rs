// src/capture/artifacts.rs
//! Per-run scratch directory for capture files. Nothing in it outlives the
//! run: `cleanup` removes it explicitly and `Drop` (via `TempDir`) covers
//! early returns and unwinding.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

pub struct ArtifactDir {
    dir: TempDir,
}

/// `tweet_{n}_{id}.png`, n is 1-based. Non-alphanumeric id chars become `_`.
pub fn artifact_filename(n: usize, id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("tweet_{n}_{safe}.png")
}

impl ArtifactDir {
    /// Create under `parent`, or the system temp dir when `None`.
    pub fn create(parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("post-snapshots-");
        let dir = match parent {
            Some(p) => {
                std::fs::create_dir_all(p)?;
                builder.tempdir_in(p)?
            }
            None => builder.tempdir()?,
        };
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn target_for(&self, n: usize, id: &str) -> PathBuf {
        self.dir.path().join(artifact_filename(n, id))
    }

    /// Remove every file, then the directory itself.
    pub fn cleanup(self) -> io::Result<()> {
        if let Ok(entries) = std::fs::read_dir(self.dir.path()) {
            for entry in entries.flatten() {
                let path = entry.path();
                match std::fs::remove_file(&path) {
                    Ok(()) => info!(file = %path.display(), "cleaned up"),
                    Err(e) => warn!(file = %path.display(), error = %e, "cleanup failed"),
                }
            }
        }
        self.dir.close()
    }
}
