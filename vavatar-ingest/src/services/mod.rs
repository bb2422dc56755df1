//! Service modules for the batch ingest pipeline
//!
//! Leaves first:
//! - `acquirer` turns a descriptor into byte content, staging a copy if needed
//! - `duration_probe` asks the shared decode engine for a clip's duration
//! - `validation` applies size and duration policy
//! - `naming` derives default display names
//! - `accumulator` owns the batch and exposes the control interface
//! - `commit` hands output records to storage

pub mod accumulator;
pub mod acquirer;
pub mod clip_store;
pub mod commit;
pub mod decode_engine;
pub mod duration_probe;
pub mod file_picker;
pub mod naming;
pub mod staging;
pub mod symphonia_engine;
pub mod validation;

pub use accumulator::{BatchAccumulator, BatchError, BatchTicket};
pub use acquirer::{AcquireError, AssetAcquirer, StagedAsset};
pub use clip_store::LibraryStore;
pub use commit::{ClipStore, CommitEmitter, CommitError, StoreError};
pub use decode_engine::{DecodeEngine, EngineError, EngineHandle, ProbeSource};
pub use duration_probe::{DurationProbe, DurationSource, ProbeResult};
pub use file_picker::{FilePicker, PathPicker, PickError, PreselectedPicker};
pub use naming::derive_display_name;
pub use staging::{StagingArea, StagingStats, TransientHandle};
pub use symphonia_engine::SymphoniaEngine;
pub use validation::{RejectReason, ValidationPolicy, Verdict};
