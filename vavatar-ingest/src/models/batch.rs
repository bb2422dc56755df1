//! Batch state machine
//!
//! IDLE → SELECTING → PROCESSING → READY → COMMITTING → IDLE
//!
//! Cancellation is reachable from SELECTING, PROCESSING and READY and
//! lands back in IDLE after releasing every staged resource.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::entry::{EntrySummary, ValidatedEntry};
use crate::services::validation::RejectReason;

/// Batch lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchPhase {
    /// No batch; nothing held
    Idle,
    /// Waiting for the file picker
    Selecting,
    /// Acquire → probe → validate loop running
    Processing,
    /// All descriptors processed; entries editable
    Ready,
    /// Entries being handed to storage
    Committing,
}

impl BatchPhase {
    /// Phases a cancellation can interrupt
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            BatchPhase::Selecting | BatchPhase::Processing | BatchPhase::Ready
        )
    }

    /// Phases from which a new selection may start
    pub fn accepts_selection(self) -> bool {
        matches!(self, BatchPhase::Idle | BatchPhase::Ready)
    }
}

/// A descriptor that did not become an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedItem {
    pub name: String,
    pub reason: RejectReason,
    /// Underlying failure message, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Mutable state of the current batch
///
/// Owned by the accumulator; every mutation happens under its lock.
#[derive(Debug)]
pub struct BatchState {
    pub batch_id: Option<Uuid>,
    pub phase: BatchPhase,
    pub entries: Vec<ValidatedEntry>,
    pub skipped: Vec<SkippedItem>,
    pub processed: usize,
    pub total: usize,
    pub in_progress: bool,
    pub last_error: Option<String>,
    pub(crate) cancel_token: Option<CancellationToken>,
}

impl Default for BatchState {
    fn default() -> Self {
        Self {
            batch_id: None,
            phase: BatchPhase::Idle,
            entries: Vec::new(),
            skipped: Vec::new(),
            processed: 0,
            total: 0,
            in_progress: false,
            last_error: None,
            cancel_token: None,
        }
    }
}

impl BatchState {
    /// Release every held entry and return to IDLE
    ///
    /// Returns the number of entries released.
    pub(crate) fn reset(&mut self) -> usize {
        let released = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.release();
        }
        *self = BatchState::default();
        released
    }

    /// True while `batch_id` is still the live batch and not cancelled
    pub(crate) fn is_current(&self, batch_id: Uuid) -> bool {
        self.batch_id == Some(batch_id)
            && self
                .cancel_token
                .as_ref()
                .map(|t| !t.is_cancelled())
                .unwrap_or(false)
    }

    pub fn find_entry_mut(&mut self, id: Uuid) -> Option<&mut ValidatedEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Locations of entries saved by an earlier partial commit
    pub(crate) fn stored_locations(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| e.stored_at.clone())
            .collect()
    }

    /// Read-only projection for the UI
    pub fn progress(&self) -> BatchProgress {
        BatchProgress {
            batch_id: self.batch_id,
            phase: self.phase,
            processed: self.processed,
            total: self.total,
            in_progress: self.in_progress,
            accepted: self.entries.len(),
            skipped: self.skipped.len(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn entry_summaries(&self) -> Vec<EntrySummary> {
        self.entries.iter().map(ValidatedEntry::summary).collect()
    }
}

/// Progress interface exposed to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub batch_id: Option<Uuid>,
    pub phase: BatchPhase,
    pub processed: usize,
    pub total: usize,
    pub in_progress: bool,
    pub accepted: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        let state = BatchState::default();
        let progress = state.progress();
        assert_eq!(progress.phase, BatchPhase::Idle);
        assert_eq!(progress.processed, 0);
        assert!(!progress.in_progress);
    }

    #[test]
    fn test_cancellable_phases() {
        assert!(!BatchPhase::Idle.is_cancellable());
        assert!(BatchPhase::Selecting.is_cancellable());
        assert!(BatchPhase::Processing.is_cancellable());
        assert!(BatchPhase::Ready.is_cancellable());
        assert!(!BatchPhase::Committing.is_cancellable());
    }

    #[test]
    fn test_is_current_requires_live_token() {
        let batch_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let mut state = BatchState {
            batch_id: Some(batch_id),
            cancel_token: Some(token.clone()),
            ..BatchState::default()
        };

        assert!(state.is_current(batch_id));
        assert!(!state.is_current(Uuid::new_v4()));

        token.cancel();
        assert!(!state.is_current(batch_id));

        state.reset();
        assert!(state.batch_id.is_none());
    }

    #[test]
    fn test_phase_serializes_uppercase() {
        let json = serde_json::to_string(&BatchPhase::Committing).unwrap();
        assert_eq!(json, "\"COMMITTING\"");
    }
}
