//! Event types for the ingest event system
//!
//! Provides the batch lifecycle events and the EventBus used to observe
//! ingest progress (SSE, CLI progress output, tests).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Batch ingest events
///
/// Broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IngestEvent {
    /// A selection was requested; previous entries have been released
    BatchSelecting {
        batch_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Descriptors obtained, processing loop started
    BatchStarted {
        batch_id: Uuid,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One descriptor passed validation and became a pending entry
    ItemAccepted {
        batch_id: Uuid,
        processed: usize,
        total: usize,
        entry_id: Uuid,
        display_name: String,
        duration_ms: u64,
    },

    /// One descriptor was skipped (non-fatal)
    ItemSkipped {
        batch_id: Uuid,
        processed: usize,
        total: usize,
        name: String,
        /// Machine-readable reason (`too_large`, `duration_unavailable`, `too_long`)
        reason: String,
        /// Underlying failure, when there was one
        detail: Option<String>,
    },

    /// Every descriptor processed; entries are editable until commit
    BatchReady {
        batch_id: Uuid,
        accepted: usize,
        skipped: usize,
    },

    /// Batch cancelled; all staged resources released
    BatchCancelled {
        batch_id: Uuid,
        /// Pending entries dropped by the cancellation
        released: usize,
        /// Storage locations of entries saved by an earlier partial commit;
        /// cancelling does not remove them from storage
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        already_stored: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Entries handed to storage
    BatchCommitted {
        batch_id: Uuid,
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Storage rejected the commit; the batch stays ready for retry
    CommitFailed { batch_id: Uuid, message: String },
}

impl IngestEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            IngestEvent::BatchSelecting { .. } => "BatchSelecting",
            IngestEvent::BatchStarted { .. } => "BatchStarted",
            IngestEvent::ItemAccepted { .. } => "ItemAccepted",
            IngestEvent::ItemSkipped { .. } => "ItemSkipped",
            IngestEvent::BatchReady { .. } => "BatchReady",
            IngestEvent::BatchCancelled { .. } => "BatchCancelled",
            IngestEvent::BatchCommitted { .. } => "BatchCommitted",
            IngestEvent::CommitFailed { .. } => "CommitFailed",
        }
    }

    /// Batch the event belongs to
    pub fn batch_id(&self) -> Uuid {
        match self {
            IngestEvent::BatchSelecting { batch_id, .. }
            | IngestEvent::BatchStarted { batch_id, .. }
            | IngestEvent::ItemAccepted { batch_id, .. }
            | IngestEvent::ItemSkipped { batch_id, .. }
            | IngestEvent::BatchReady { batch_id, .. }
            | IngestEvent::BatchCancelled { batch_id, .. }
            | IngestEvent::BatchCommitted { batch_id, .. }
            | IngestEvent::CommitFailed { batch_id, .. } => *batch_id,
        }
    }
}

/// Broadcast bus for ingest events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<IngestEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// # Examples
    ///
    /// ```
    /// use vavatar_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: IngestEvent,
    ) -> Result<usize, broadcast::error::SendError<IngestEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: IngestEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = IngestEvent::BatchReady {
            batch_id: Uuid::nil(),
            accepted: 2,
            skipped: 1,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BatchReady");
        assert_eq!(json["accepted"], 2);
        assert_eq!(event.event_type(), "BatchReady");
    }

    #[test]
    fn test_emit_without_subscribers_is_reported() {
        let bus = EventBus::new(8);
        let event = IngestEvent::CommitFailed {
            batch_id: Uuid::nil(),
            message: "disk full".to_string(),
        };
        assert!(bus.emit(event.clone()).is_err());

        // Lossy emit never fails
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let batch_id = Uuid::new_v4();

        bus.emit_lossy(IngestEvent::BatchStarted {
            batch_id,
            total: 3,
            timestamp: chrono::Utc::now(),
        });
        bus.emit_lossy(IngestEvent::BatchReady {
            batch_id,
            accepted: 1,
            skipped: 2,
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "BatchStarted");
        assert_eq!(second.event_type(), "BatchReady");
        assert_eq!(second.batch_id(), batch_id);
    }
}
