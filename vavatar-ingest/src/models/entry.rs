//! Pending entries and output records

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;
use vavatar_common::human_time::{duration_ms, format_clip_duration};

use super::descriptor::{ClipBytes, SelectionDescriptor};
use crate::services::acquirer::StagedAsset;
use crate::services::staging::TransientHandle;

/// An accepted clip, editable by the user until commit
///
/// Owns the staged content of the asset it was built from, including the
/// transient file if one was created. Dropping the entry releases it.
#[derive(Debug)]
pub struct ValidatedEntry {
    pub id: Uuid,
    /// User-editable label
    pub display_name: String,
    pub duration: Duration,
    pub content: ClipBytes,
    pub descriptor: SelectionDescriptor,
    /// Location assigned by storage during a commit attempt that later failed
    pub stored_at: Option<String>,
    pub added_at: DateTime<Utc>,
    transient: Option<TransientHandle>,
}

impl ValidatedEntry {
    /// Take ownership of an accepted asset
    pub fn from_staged(asset: StagedAsset, display_name: String, duration: Duration) -> Self {
        let StagedAsset {
            descriptor,
            content,
            transient,
        } = asset;

        Self {
            id: Uuid::new_v4(),
            display_name,
            duration,
            content,
            descriptor,
            stored_at: None,
            added_at: Utc::now(),
            transient,
        }
    }

    pub fn has_transient(&self) -> bool {
        self.transient.is_some()
    }

    /// Release the transient copy (if any) and drop the entry
    pub fn release(mut self) {
        if let Some(handle) = self.transient.take() {
            handle.release();
        }
    }

    /// Record handed to storage for this entry
    pub fn to_output_record(&self) -> OutputRecord {
        OutputRecord {
            display_name: self.display_name.clone(),
            duration: self.duration,
            content: self.content.clone(),
            source_name: self.descriptor.name.clone(),
        }
    }

    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id,
            display_name: self.display_name.clone(),
            source_name: self.descriptor.name.clone(),
            duration_ms: duration_ms(self.duration),
            duration_display: format_clip_duration(self.duration),
            size_bytes: self.content.len() as u64,
            stored_at: self.stored_at.clone(),
            added_at: self.added_at,
        }
    }
}

/// Serializable view of a pending entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub id: Uuid,
    pub display_name: String,
    pub source_name: String,
    pub duration_ms: u64,
    pub duration_display: String,
    pub size_bytes: u64,
    /// Set once an earlier partial commit saved this entry; it can no
    /// longer be renamed or removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// One clip handed to the storage collaborator
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub display_name: String,
    pub duration: Duration,
    pub content: ClipBytes,
    /// Original file name, kept for the container extension
    pub source_name: String,
}

/// A record accepted by storage, with the location storage returned
#[derive(Debug, Clone)]
pub struct CommittedClip {
    pub entry_id: Uuid,
    pub record: OutputRecord,
    /// Opaque identifier/path returned by storage
    pub location: String,
}
