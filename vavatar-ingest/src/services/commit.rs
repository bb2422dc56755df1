//! Commit: pending entries → storage collaborator
//!
//! Records are saved in entry order. A storage failure stops the commit
//! and reports which records were already saved, so a retry can skip
//! them instead of storing duplicates.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{BatchPhase, CommittedClip, OutputRecord};

/// Storage collaborator failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage rejected clip: {0}")]
    Rejected(String),
}

/// Durable storage for committed clips
#[async_trait::async_trait]
pub trait ClipStore: Send + Sync {
    /// Persist one clip; returns an opaque identifier/path
    async fn save(&self, record: &OutputRecord) -> Result<String, StoreError>;
}

/// Batch-level commit failures
#[derive(Debug, Error)]
pub enum CommitError {
    /// There are no entries to commit
    #[error("Nothing to commit: the batch has no entries")]
    EmptyBatch,

    /// The batch is still selecting, processing or committing
    #[error("Batch is not ready to commit (phase {0:?})")]
    NotReady(BatchPhase),

    /// Storage failed; the batch is still ready for a retry
    #[error("Failed to persist '{display_name}': {source}")]
    PersistFailure {
        display_name: String,
        #[source]
        source: StoreError,
    },
}

/// One entry queued for storage
#[derive(Debug)]
pub(crate) struct PendingRecord {
    pub entry_id: Uuid,
    pub record: OutputRecord,
    /// Location from an earlier partial commit
    pub stored_at: Option<String>,
}

/// Storage failure part-way through a commit
#[derive(Debug)]
pub(crate) struct PersistFailure {
    /// Entries saved before the failure, with their locations
    pub persisted: Vec<(Uuid, String)>,
    pub display_name: String,
    pub source: StoreError,
}

/// Hands output records to the storage collaborator
#[derive(Clone)]
pub struct CommitEmitter {
    store: Arc<dyn ClipStore>,
}

impl CommitEmitter {
    pub fn new(store: Arc<dyn ClipStore>) -> Self {
        Self { store }
    }

    pub(crate) async fn emit(
        &self,
        pending: Vec<PendingRecord>,
    ) -> Result<Vec<CommittedClip>, PersistFailure> {
        let mut committed: Vec<CommittedClip> = Vec::with_capacity(pending.len());

        for item in pending {
            let location = match item.stored_at {
                Some(location) => {
                    debug!(entry_id = %item.entry_id, %location, "Entry already stored, skipping save");
                    location
                }
                None => match self.store.save(&item.record).await {
                    Ok(location) => location,
                    Err(source) => {
                        return Err(PersistFailure {
                            persisted: committed
                                .iter()
                                .map(|c| (c.entry_id, c.location.clone()))
                                .collect(),
                            display_name: item.record.display_name,
                            source,
                        });
                    }
                },
            };

            committed.push(CommittedClip {
                entry_id: item.entry_id,
                record: item.record,
                location,
            });
        }

        Ok(committed)
    }
}

impl std::fmt::Debug for CommitEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitEmitter").finish_non_exhaustive()
    }
}
