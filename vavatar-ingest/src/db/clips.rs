//! Voice clip index

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// One stored clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceClip {
    pub id: Uuid,
    pub display_name: String,
    pub duration_ms: i64,
    pub size_bytes: i64,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// Index a stored clip
pub async fn save_clip(pool: &SqlitePool, clip: &VoiceClip) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO voice_clips (id, display_name, duration_ms, size_bytes, path, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(clip.id.to_string())
    .bind(&clip.display_name)
    .bind(clip.duration_ms)
    .bind(clip.size_bytes)
    .bind(&clip.path)
    .bind(clip.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// All clips, oldest first
pub async fn list_clips(pool: &SqlitePool) -> Result<Vec<VoiceClip>> {
    let rows = sqlx::query(
        r#"
        SELECT id, display_name, duration_ms, size_bytes, path, created_at
        FROM voice_clips
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let id_str: String = row.get("id");
            let created_str: String = row.get("created_at");

            Ok(VoiceClip {
                id: Uuid::parse_str(&id_str)?,
                display_name: row.get("display_name"),
                duration_ms: row.get("duration_ms"),
                size_bytes: row.get("size_bytes"),
                path: row.get("path"),
                created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            })
        })
        .collect()
}

/// Number of indexed clips
pub async fn count_clips(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM voice_clips")
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}
