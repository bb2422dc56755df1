//! Batch accumulator
//!
//! Drives one batch through selection, the per-descriptor
//! acquire → probe → validate loop, user edits and commit.
//!
//! Every batch carries a `CancellationToken`. The processing loop races
//! each item against the token, and after every await it re-checks that
//! its batch is still the live one before touching state. A result that
//! arrives after cancellation is dropped, which releases whatever it had
//! staged.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vavatar_common::events::{EventBus, IngestEvent};
use vavatar_common::human_time::duration_ms;

use super::acquirer::{AcquireError, AssetAcquirer};
use super::commit::{CommitEmitter, CommitError, PendingRecord};
use super::duration_probe::DurationProbe;
use super::file_picker::{FilePicker, PickError, PreselectedPicker};
use super::naming::derive_display_name;
use super::staging::StagingStats;
use super::validation::{RejectReason, ValidationPolicy, Verdict};
use crate::models::{
    BatchPhase, BatchProgress, BatchState, CommittedClip, EntrySummary, SelectionDescriptor,
    SkippedItem, ValidatedEntry,
};

/// Control-operation failures
#[derive(Debug, Error)]
pub enum BatchError {
    /// A batch is selecting, processing or committing
    #[error("A batch is already in progress (phase {0:?})")]
    Busy(BatchPhase),

    /// Edits are only allowed once processing has finished
    #[error("Batch is not ready for edits (phase {0:?})")]
    NotReady(BatchPhase),

    #[error("Display name must not be empty")]
    InvalidName,

    /// Saved by an earlier partial commit; storage already holds it as is
    #[error("Entry {id} is already stored at {location}")]
    AlreadyStored { id: Uuid, location: String },

    #[error(transparent)]
    Picker(#[from] PickError),
}

/// Claim on a freshly started batch
///
/// Returned by [`BatchAccumulator::begin_selection`] and consumed by
/// [`BatchAccumulator::run`].
#[derive(Debug)]
pub struct BatchTicket {
    batch_id: Uuid,
    token: CancellationToken,
}

impl BatchTicket {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }
}

/// Result of running one descriptor through the pipeline
enum ItemOutcome {
    Accepted(ValidatedEntry),
    Skipped(SkippedItem),
}

struct Inner {
    state: RwLock<BatchState>,
    acquirer: AssetAcquirer,
    probe: DurationProbe,
    policy: ValidationPolicy,
    emitter: CommitEmitter,
    event_bus: EventBus,
}

/// Owns the current batch and exposes the control interface
///
/// Cheap to clone; clones share the same batch.
#[derive(Clone)]
pub struct BatchAccumulator {
    inner: Arc<Inner>,
}

impl BatchAccumulator {
    pub fn new(
        acquirer: AssetAcquirer,
        probe: DurationProbe,
        policy: ValidationPolicy,
        emitter: CommitEmitter,
        event_bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(BatchState::default()),
                acquirer,
                probe,
                policy,
                emitter,
                event_bus,
            }),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.inner.policy
    }

    /// Transient-file accounting of the staging area
    pub fn staging_stats(&self) -> StagingStats {
        self.inner.acquirer.staging().stats()
    }

    /// Read-only progress projection
    pub async fn progress(&self) -> BatchProgress {
        self.inner.state.read().await.progress()
    }

    /// Pending entries in selection order
    pub async fn entries(&self) -> Vec<EntrySummary> {
        self.inner.state.read().await.entry_summaries()
    }

    /// Descriptors skipped so far, with reasons
    pub async fn skipped(&self) -> Vec<SkippedItem> {
        self.inner.state.read().await.skipped.clone()
    }

    /// Pick files and process them; returns once the batch is ready,
    /// cancelled or dismissed
    pub async fn select<P>(&self, picker: &P) -> Result<BatchProgress, BatchError>
    where
        P: FilePicker + ?Sized,
    {
        let ticket = self.begin_selection().await?;
        self.run(ticket, picker).await
    }

    /// Process descriptors obtained outside a picker
    pub async fn ingest(
        &self,
        descriptors: Vec<SelectionDescriptor>,
    ) -> Result<BatchProgress, BatchError> {
        self.select(&PreselectedPicker::new(descriptors)).await
    }

    /// IDLE/READY → SELECTING
    ///
    /// Releases the previous batch's entries and claims a new batch id.
    /// Split from [`run`](Self::run) so callers can refuse a busy
    /// pipeline before spawning the work.
    pub async fn begin_selection(&self) -> Result<BatchTicket, BatchError> {
        let mut state = self.inner.state.write().await;
        if !state.phase.accepts_selection() {
            return Err(BatchError::Busy(state.phase));
        }

        let released = state.reset();
        if released > 0 {
            debug!(released, "Released entries of previous batch");
        }

        let batch_id = Uuid::new_v4();
        let token = CancellationToken::new();
        state.batch_id = Some(batch_id);
        state.phase = BatchPhase::Selecting;
        state.cancel_token = Some(token.clone());

        info!(batch_id = %batch_id, "Batch selection started");
        self.inner.event_bus.emit_lossy(IngestEvent::BatchSelecting {
            batch_id,
            timestamp: chrono::Utc::now(),
        });

        Ok(BatchTicket { batch_id, token })
    }

    /// SELECTING → PROCESSING → READY
    pub async fn run<P>(&self, ticket: BatchTicket, picker: &P) -> Result<BatchProgress, BatchError>
    where
        P: FilePicker + ?Sized,
    {
        let BatchTicket { batch_id, token } = ticket;

        let picked = tokio::select! {
            _ = token.cancelled() => {
                debug!(batch_id = %batch_id, "Cancelled while selecting");
                return Ok(self.progress().await);
            }
            picked = picker.pick() => picked,
        };

        let descriptors = match picked {
            Ok(descriptors) => descriptors,
            Err(e) => {
                let mut state = self.inner.state.write().await;
                if state.is_current(batch_id) {
                    state.reset();
                }
                warn!(batch_id = %batch_id, error = %e, "File selection failed");
                return Err(e.into());
            }
        };

        let total = descriptors.len();
        {
            let mut state = self.inner.state.write().await;
            if !state.is_current(batch_id) {
                return Ok(state.progress());
            }
            if total == 0 {
                state.reset();
                info!(batch_id = %batch_id, "Selection dismissed");
                return Ok(state.progress());
            }
            state.phase = BatchPhase::Processing;
            state.total = total;
            state.processed = 0;
            state.in_progress = true;
        }

        info!(batch_id = %batch_id, total, "Processing batch");
        self.inner.event_bus.emit_lossy(IngestEvent::BatchStarted {
            batch_id,
            total,
            timestamp: chrono::Utc::now(),
        });

        for descriptor in descriptors {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                outcome = self.process_one(descriptor) => Some(outcome),
            };

            let Some(outcome) = outcome else {
                debug!(batch_id = %batch_id, "Cancelled mid-item; in-flight work discarded");
                return Ok(self.progress().await);
            };

            let mut state = self.inner.state.write().await;
            if !state.is_current(batch_id) {
                // Late result: dropping it releases its staged copy
                drop(outcome);
                return Ok(state.progress());
            }

            state.processed += 1;
            let processed = state.processed;

            match outcome {
                ItemOutcome::Accepted(entry) => {
                    debug!(
                        batch_id = %batch_id,
                        entry_id = %entry.id,
                        display_name = %entry.display_name,
                        duration_ms = duration_ms(entry.duration),
                        "Clip accepted"
                    );
                    self.inner.event_bus.emit_lossy(IngestEvent::ItemAccepted {
                        batch_id,
                        processed,
                        total,
                        entry_id: entry.id,
                        display_name: entry.display_name.clone(),
                        duration_ms: duration_ms(entry.duration),
                    });
                    state.entries.push(entry);
                }
                ItemOutcome::Skipped(item) => {
                    warn!(
                        batch_id = %batch_id,
                        name = %item.name,
                        reason = %item.reason,
                        detail = item.detail.as_deref().unwrap_or(""),
                        "Clip skipped"
                    );
                    self.inner.event_bus.emit_lossy(IngestEvent::ItemSkipped {
                        batch_id,
                        processed,
                        total,
                        name: item.name.clone(),
                        reason: item.reason.to_string(),
                        detail: item.detail.clone(),
                    });
                    state.skipped.push(item);
                }
            }
        }

        let mut state = self.inner.state.write().await;
        if !state.is_current(batch_id) {
            return Ok(state.progress());
        }
        state.phase = BatchPhase::Ready;
        state.in_progress = false;

        let (accepted, skipped) = (state.entries.len(), state.skipped.len());
        info!(batch_id = %batch_id, accepted, skipped, "Batch ready");
        self.inner.event_bus.emit_lossy(IngestEvent::BatchReady {
            batch_id,
            accepted,
            skipped,
        });

        Ok(state.progress())
    }

    /// Acquire → probe → validate → name, for one descriptor
    ///
    /// Never fails; every problem becomes a skipped item.
    async fn process_one(&self, descriptor: SelectionDescriptor) -> ItemOutcome {
        let name = descriptor.name.clone();

        let asset = match self.inner.acquirer.acquire(descriptor).await {
            Ok(asset) => asset,
            Err(e) => {
                let reason = match e {
                    AcquireError::TooLarge { .. } => RejectReason::TooLarge,
                    _ => RejectReason::DurationUnavailable,
                };
                return ItemOutcome::Skipped(SkippedItem {
                    name,
                    reason,
                    detail: Some(e.to_string()),
                });
            }
        };

        let probe = self.inner.probe.probe(&asset).await;

        match self.inner.policy.validate(&asset, &probe) {
            Verdict::Accept(duration) => {
                let display_name = derive_display_name(&name);
                ItemOutcome::Accepted(ValidatedEntry::from_staged(asset, display_name, duration))
            }
            Verdict::Reject(reason) => {
                // Dropping the asset releases its staged copy
                drop(asset);
                ItemOutcome::Skipped(SkippedItem {
                    name,
                    reason,
                    detail: None,
                })
            }
        }
    }

    /// Change a pending entry's display name
    ///
    /// Returns `Ok(false)` when no entry has that id.
    pub async fn rename(&self, id: Uuid, display_name: &str) -> Result<bool, BatchError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(BatchError::InvalidName);
        }

        let mut state = self.inner.state.write().await;
        if state.phase != BatchPhase::Ready {
            return Err(BatchError::NotReady(state.phase));
        }

        match state.find_entry_mut(id) {
            Some(entry) => {
                if let Some(location) = &entry.stored_at {
                    return Err(BatchError::AlreadyStored {
                        id,
                        location: location.clone(),
                    });
                }
                debug!(entry_id = %id, from = %entry.display_name, to = %display_name, "Entry renamed");
                entry.display_name = display_name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drop a pending entry and release its staged copy
    ///
    /// Returns `Ok(false)` when no entry has that id.
    pub async fn remove(&self, id: Uuid) -> Result<bool, BatchError> {
        let mut state = self.inner.state.write().await;
        if state.phase != BatchPhase::Ready {
            return Err(BatchError::NotReady(state.phase));
        }

        let Some(index) = state.entries.iter().position(|e| e.id == id) else {
            return Ok(false);
        };
        if let Some(location) = &state.entries[index].stored_at {
            return Err(BatchError::AlreadyStored {
                id,
                location: location.clone(),
            });
        }

        let entry = state.entries.remove(index);
        debug!(entry_id = %id, display_name = %entry.display_name, "Entry removed");
        entry.release();
        Ok(true)
    }

    /// Abandon the current batch
    ///
    /// Returns `false` (and does nothing) when there is nothing to cancel,
    /// including while a commit is in flight. Repeated calls are harmless.
    /// Entries saved by an earlier partial commit stay in storage; their
    /// locations are logged and carried on the `BatchCancelled` event.
    pub async fn cancel(&self) -> bool {
        let mut state = self.inner.state.write().await;
        if !state.phase.is_cancellable() {
            return false;
        }

        if let Some(token) = &state.cancel_token {
            token.cancel();
        }
        let batch_id = state.batch_id;
        let phase = state.phase;
        let already_stored = state.stored_locations();
        let released = state.reset();

        if let Some(batch_id) = batch_id {
            info!(batch_id = %batch_id, ?phase, released, "Batch cancelled");
            if !already_stored.is_empty() {
                warn!(
                    batch_id = %batch_id,
                    locations = ?already_stored,
                    "Cancelled batch had entries already in storage"
                );
            }
            self.inner.event_bus.emit_lossy(IngestEvent::BatchCancelled {
                batch_id,
                released,
                already_stored,
                timestamp: chrono::Utc::now(),
            });
        }
        true
    }

    /// READY → COMMITTING → IDLE
    ///
    /// On a storage failure the batch returns to READY with its entries
    /// intact; entries already stored remember their location so a retry
    /// does not store them twice.
    pub async fn commit(&self) -> Result<Vec<CommittedClip>, CommitError> {
        let (batch_id, pending) = {
            let mut state = self.inner.state.write().await;
            match state.phase {
                BatchPhase::Ready => {}
                BatchPhase::Idle => return Err(CommitError::EmptyBatch),
                other => return Err(CommitError::NotReady(other)),
            }
            if state.entries.is_empty() {
                return Err(CommitError::EmptyBatch);
            }

            state.phase = BatchPhase::Committing;
            let pending: Vec<PendingRecord> = state
                .entries
                .iter()
                .map(|entry| PendingRecord {
                    entry_id: entry.id,
                    record: entry.to_output_record(),
                    stored_at: entry.stored_at.clone(),
                })
                .collect();
            (state.batch_id.unwrap_or_default(), pending)
        };

        info!(batch_id = %batch_id, count = pending.len(), "Committing batch");

        match self.inner.emitter.emit(pending).await {
            Ok(committed) => {
                let mut state = self.inner.state.write().await;
                state.reset();

                info!(batch_id = %batch_id, count = committed.len(), "Batch committed");
                self.inner.event_bus.emit_lossy(IngestEvent::BatchCommitted {
                    batch_id,
                    count: committed.len(),
                    timestamp: chrono::Utc::now(),
                });
                Ok(committed)
            }
            Err(failure) => {
                let mut state = self.inner.state.write().await;
                for (entry_id, location) in failure.persisted {
                    if let Some(entry) = state.find_entry_mut(entry_id) {
                        entry.stored_at = Some(location);
                    }
                }

                let error = CommitError::PersistFailure {
                    display_name: failure.display_name,
                    source: failure.source,
                };
                let message = error.to_string();
                state.phase = BatchPhase::Ready;
                state.last_error = Some(message.clone());

                warn!(batch_id = %batch_id, error = %message, "Commit failed; batch kept for retry");
                self.inner
                    .event_bus
                    .emit_lossy(IngestEvent::CommitFailed { batch_id, message });
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for BatchAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchAccumulator")
            .field("policy", &self.inner.policy)
            .field("engine", &self.inner.probe.engine().name())
            .finish_non_exhaustive()
    }
}
