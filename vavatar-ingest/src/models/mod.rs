//! Data models for the batch ingest pipeline
//!
//! - Selection descriptors supplied by the file picker
//! - Validated entries pending commit and the records handed to storage
//! - Batch state machine and its read-only progress projection

pub mod batch;
pub mod descriptor;
pub mod entry;

pub use batch::{BatchPhase, BatchProgress, BatchState, SkippedItem};
pub use descriptor::{ClipBytes, SelectionDescriptor};
pub use entry::{CommittedClip, EntrySummary, OutputRecord, ValidatedEntry};
