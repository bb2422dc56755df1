//! Clip library: files under `<root>/clips` indexed in SQLite

use chrono::Utc;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use vavatar_common::human_time::duration_ms;

use super::commit::{ClipStore, StoreError};
use crate::db::clips::{self, VoiceClip};
use crate::models::OutputRecord;

/// Extension used when the source name has none
const FALLBACK_EXTENSION: &str = "bin";

/// Storage collaborator backed by the library folder and database
#[derive(Debug, Clone)]
pub struct LibraryStore {
    db: SqlitePool,
    clips_dir: PathBuf,
}

impl LibraryStore {
    pub fn new(db: SqlitePool, clips_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            clips_dir: clips_dir.into(),
        }
    }

    pub fn clips_dir(&self) -> &Path {
        &self.clips_dir
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Every clip in the library, oldest first
    pub async fn list(&self) -> anyhow::Result<Vec<VoiceClip>> {
        clips::list_clips(&self.db).await
    }
}

fn extension_of(source_name: &str) -> String {
    Path::new(source_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

#[async_trait::async_trait]
impl ClipStore for LibraryStore {
    async fn save(&self, record: &OutputRecord) -> Result<String, StoreError> {
        let id = Uuid::new_v4();
        let path = self
            .clips_dir
            .join(format!("{}.{}", id, extension_of(&record.source_name)));

        tokio::fs::create_dir_all(&self.clips_dir).await?;
        tokio::fs::write(&path, &record.content[..]).await?;

        let clip = VoiceClip {
            id,
            display_name: record.display_name.clone(),
            duration_ms: duration_ms(record.duration) as i64,
            size_bytes: record.content.len() as i64,
            path: path.display().to_string(),
            created_at: Utc::now(),
        };

        if let Err(e) = clips::save_clip(&self.db, &clip).await {
            // Don't leave an unindexed file behind
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %remove_err, "Failed to remove unindexed clip");
            }
            return Err(e.into());
        }

        debug!(clip_id = %id, display_name = %clip.display_name, path = %clip.path, "Clip stored");
        Ok(clip.path)
    }
}
