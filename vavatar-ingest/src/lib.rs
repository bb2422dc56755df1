//! vavatar-ingest library interface
//!
//! Batch audio ingestion for voice avatars: the pipeline itself, the
//! symphonia-backed decode engine, the clip library, and the HTTP
//! control surface built on top of them.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::info;
use vavatar_common::events::EventBus;

use crate::config::IngestSettings;
use crate::services::{
    AssetAcquirer, BatchAccumulator, ClipStore, CommitEmitter, DurationProbe, EngineHandle,
    LibraryStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The single batch pipeline
    pub pipeline: BatchAccumulator,
    /// Stored clips, for browsing
    pub library: LibraryStore,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(pipeline: BatchAccumulator, library: LibraryStore) -> Self {
        Self {
            event_bus: pipeline.event_bus().clone(),
            pipeline,
            library,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Wire the pipeline components together
///
/// Probing from memory needs both the setting and an engine that can
/// read bytes without a path; otherwise clips are staged to disk.
pub fn build_pipeline(
    settings: &IngestSettings,
    engine: EngineHandle,
    store: Arc<dyn ClipStore>,
    event_bus: EventBus,
) -> BatchAccumulator {
    let in_memory = settings.in_memory_probe && engine.supports_in_memory();
    info!(
        engine = engine.name(),
        in_memory,
        staging_dir = %settings.staging_dir.display(),
        probe_timeout_ms = settings.probe_timeout.as_millis() as u64,
        "Ingest pipeline configured"
    );

    let acquirer = AssetAcquirer::new(settings.staging_area(), settings.policy.max_bytes, in_memory);
    let probe = DurationProbe::new(engine, settings.probe_timeout);

    BatchAccumulator::new(
        acquirer,
        probe,
        settings.policy,
        CommitEmitter::new(store),
        event_bus,
    )
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::batch_routes())
        .merge(api::clip_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
