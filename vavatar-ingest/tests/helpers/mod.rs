//! Shared test helpers for vavatar-ingest integration tests
#![allow(dead_code)]

pub mod audio_generator;
pub mod fake_engine;
pub mod stores;

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vavatar_common::events::EventBus;
use vavatar_ingest::config::IngestSettings;
use vavatar_ingest::models::SelectionDescriptor;
use vavatar_ingest::services::{BatchAccumulator, EngineHandle, ValidationPolicy};

use fake_engine::{EngineObserver, ScriptedEngine};
use stores::RecordingStore;

pub const MIB: u64 = 1024 * 1024;

/// A pipeline wired to a scripted engine and a recording store
pub struct Harness {
    pub pipeline: BatchAccumulator,
    pub store: Arc<RecordingStore>,
    pub engine: EngineObserver,
    pub event_bus: EventBus,
    /// Keeps the staging directory alive
    pub staging_dir: TempDir,
}

pub fn harness(engine: ScriptedEngine, in_memory_probe: bool, probe_timeout: Duration) -> Harness {
    let staging_dir = TempDir::new().unwrap();
    let settings = IngestSettings {
        probe_timeout,
        in_memory_probe,
        staging_dir: staging_dir.path().join("staging"),
        policy: ValidationPolicy::default(),
    };

    let observer = engine.observer();
    let store = Arc::new(RecordingStore::default());
    let event_bus = EventBus::new(256);
    let pipeline = vavatar_ingest::build_pipeline(
        &settings,
        EngineHandle::new(engine),
        store.clone(),
        event_bus.clone(),
    );

    Harness {
        pipeline,
        store,
        engine: observer,
        event_bus,
        staging_dir,
    }
}

/// Descriptor whose bytes are its own name, so the scripted engine can
/// recognise it from memory or from a staged copy
pub fn clip(name: &str, size_bytes: u64) -> SelectionDescriptor {
    SelectionDescriptor {
        name: name.to_string(),
        size_bytes,
        raw_bytes: Some(name.as_bytes().to_vec().into()),
        source_path: None,
    }
}
