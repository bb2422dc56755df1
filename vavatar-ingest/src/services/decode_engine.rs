//! Decode engine seam
//!
//! The engine is an external, stateful resource: it is reset, loaded with
//! one clip, and then either announces the clip's duration through a
//! signal or answers an explicit query. One instance services one probe
//! at a time, so it lives behind `EngineHandle`'s one-slot lock.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::models::ClipBytes;

/// Decode engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not open or recognise the clip
    #[error("Engine failed to load clip: {0}")]
    Load(String),

    /// Explicit duration query failed
    #[error("Engine duration query failed: {0}")]
    Query(String),

    /// A query was made with nothing loaded
    #[error("Engine has no clip loaded")]
    NotLoaded,

    /// Background decode task panicked or was aborted
    #[error("Engine task failed: {0}")]
    Task(String),
}

/// Where the engine reads the clip from
#[derive(Debug, Clone)]
pub enum ProbeSource {
    /// Clip bytes handed over directly
    Memory {
        bytes: ClipBytes,
        extension: Option<String>,
    },
    /// Path to a staged copy
    File(PathBuf),
}

impl ProbeSource {
    pub fn extension(&self) -> Option<String> {
        match self {
            ProbeSource::Memory { extension, .. } => extension.clone(),
            ProbeSource::File(path) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase()),
        }
    }
}

/// External audio decode engine
///
/// Probe protocol: `reset` → `duration_signal` → `load` → wait for the
/// signal or fall back to `query_duration`.
#[async_trait::async_trait]
pub trait DecodeEngine: Send {
    /// Engine name for logging
    fn name(&self) -> &'static str;

    /// Whether `ProbeSource::Memory` is accepted
    fn supports_in_memory(&self) -> bool;

    /// Return to idle, discarding any loaded clip
    async fn reset(&mut self) -> Result<(), EngineError>;

    /// Subscribe to the duration-available signal for the next load
    ///
    /// The receiver observes `Some(duration)` once the engine knows it.
    fn duration_signal(&mut self) -> watch::Receiver<Option<Duration>>;

    /// Load a clip
    async fn load(&mut self, source: ProbeSource) -> Result<(), EngineError>;

    /// Ask the engine for the loaded clip's duration
    async fn query_duration(&mut self) -> Result<Option<Duration>, EngineError>;
}

/// Shared handle to the single decode engine instance
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<Mutex<Box<dyn DecodeEngine>>>,
    name: &'static str,
    supports_in_memory: bool,
}

impl EngineHandle {
    pub fn new<E: DecodeEngine + 'static>(engine: E) -> Self {
        let name = engine.name();
        let supports_in_memory = engine.supports_in_memory();
        Self {
            inner: Arc::new(Mutex::new(Box::new(engine))),
            name,
            supports_in_memory,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn supports_in_memory(&self) -> bool {
        self.supports_in_memory
    }

    /// Exclusive access for the duration of one probe
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Box<dyn DecodeEngine>> {
        self.inner.lock().await
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("name", &self.name)
            .field("supports_in_memory", &self.supports_in_memory)
            .finish()
    }
}
