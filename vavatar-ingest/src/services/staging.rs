//! Transient on-disk staging for clips the decode engine must read by path
//!
//! Every staged file is owned by exactly one `TransientHandle`. The
//! handle deletes the file when released or dropped, whichever happens
//! first, and the staging area counts creations and releases so the
//! batch can prove nothing leaked.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::models::ClipBytes;

#[derive(Debug, Default)]
struct StagingCounters {
    created: AtomicUsize,
    released: AtomicUsize,
}

/// Snapshot of staging activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StagingStats {
    pub created: usize,
    pub released: usize,
}

impl StagingStats {
    /// Files created but not yet released
    pub fn outstanding(&self) -> usize {
        self.created.saturating_sub(self.released)
    }
}

/// Directory holding transient clip copies
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    counters: Arc<StagingCounters>,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counters: Arc::new(StagingCounters::default()),
        }
    }

    /// `<system temp>/vavatar-staging`
    pub fn system_default() -> Self {
        Self::new(std::env::temp_dir().join("vavatar-staging"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats(&self) -> StagingStats {
        StagingStats {
            created: self.counters.created.load(Ordering::SeqCst),
            released: self.counters.released.load(Ordering::SeqCst),
        }
    }

    /// Write `content` to a uniquely named file in the staging directory
    ///
    /// At most one file is created per call; the caller owns the handle.
    pub async fn stage(
        &self,
        extension: Option<&str>,
        content: ClipBytes,
    ) -> std::io::Result<TransientHandle> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let dir = self.dir.clone();
        let suffix = extension.map(|e| format!(".{}", e)).unwrap_or_default();

        let temp_path = tokio::task::spawn_blocking(move || -> std::io::Result<TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix("clip-")
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            file.write_all(&content)?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(std::io::Error::other)??;

        self.counters.created.fetch_add(1, Ordering::SeqCst);
        let location = temp_path.to_path_buf();
        debug!(path = %location.display(), "Staged transient clip copy");

        Ok(TransientHandle {
            location,
            temp: Some(temp_path),
            counters: Arc::clone(&self.counters),
        })
    }
}

/// Exclusive owner of one staged file
#[derive(Debug)]
pub struct TransientHandle {
    location: PathBuf,
    temp: Option<TempPath>,
    counters: Arc<StagingCounters>,
}

impl TransientHandle {
    pub fn path(&self) -> &Path {
        &self.location
    }

    /// Delete the staged file
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        let Some(temp) = self.temp.take() else {
            return;
        };

        if let Err(e) = temp.close() {
            warn!(
                path = %self.location.display(),
                error = %e,
                "Failed to delete staged clip copy"
            );
        }
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        debug!(path = %self.location.display(), "Released transient clip copy");
    }
}

impl Drop for TransientHandle {
    fn drop(&mut self) {
        self.release_inner();
    }
}
