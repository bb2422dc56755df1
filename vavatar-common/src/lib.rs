//! # Voice Avatar Common Library
//!
//! Shared code for the voice-avatar services:
//! - Error type and result alias
//! - TOML bootstrap configuration and root folder resolution
//! - Ingest event types and the broadcast event bus
//! - Human-readable clip duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{EventBus, IngestEvent};
