//! Asset acquisition: descriptor → byte content (+ optional staged copy)

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use super::decode_engine::ProbeSource;
use super::staging::{StagingArea, TransientHandle};
use crate::models::{ClipBytes, SelectionDescriptor};

/// Acquisition failures
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Clip exceeds the size ceiling; nothing was allocated
    #[error("Clip too large: {size_bytes} bytes (limit {limit_bytes})")]
    TooLarge { size_bytes: u64, limit_bytes: u64 },

    /// Neither bytes nor a path were supplied
    #[error("Descriptor '{0}' has no content source")]
    NoContent(String),

    /// Reading the source path failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the transient copy failed
    #[error("Failed to stage clip: {0}")]
    Staging(#[source] std::io::Error),
}

/// Acquired, byte-addressable clip
///
/// Owns its transient copy exclusively; dropping the asset releases it.
#[derive(Debug)]
pub struct StagedAsset {
    pub descriptor: SelectionDescriptor,
    pub content: ClipBytes,
    pub transient: Option<TransientHandle>,
}

impl StagedAsset {
    /// What the decode engine should read
    pub fn probe_source(&self) -> ProbeSource {
        match &self.transient {
            Some(handle) => ProbeSource::File(handle.path().to_path_buf()),
            None => ProbeSource::Memory {
                bytes: self.content.clone(),
                extension: self.descriptor.extension(),
            },
        }
    }
}

/// Turns selection descriptors into staged assets
#[derive(Debug, Clone)]
pub struct AssetAcquirer {
    staging: StagingArea,
    max_bytes: u64,
    in_memory: bool,
}

impl AssetAcquirer {
    /// `in_memory`: the decode engine can read bytes without a path
    pub fn new(staging: StagingArea, max_bytes: u64, in_memory: bool) -> Self {
        Self {
            staging,
            max_bytes,
            in_memory,
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn in_memory(&self) -> bool {
        self.in_memory
    }

    /// Acquire content for one descriptor
    ///
    /// Creates at most one transient file; the returned asset owns it.
    pub async fn acquire(&self, descriptor: SelectionDescriptor) -> Result<StagedAsset, AcquireError> {
        if descriptor.size_bytes > self.max_bytes {
            return Err(AcquireError::TooLarge {
                size_bytes: descriptor.size_bytes,
                limit_bytes: self.max_bytes,
            });
        }

        let content: ClipBytes = match (&descriptor.raw_bytes, &descriptor.source_path) {
            (Some(bytes), _) => bytes.clone(),
            (None, Some(path)) => tokio::fs::read(path)
                .await
                .map_err(|source| AcquireError::Read {
                    path: path.clone(),
                    source,
                })?
                .into(),
            (None, None) => return Err(AcquireError::NoContent(descriptor.name.clone())),
        };

        // The picker's size may be stale; the bytes are authoritative
        let actual = content.len() as u64;
        if actual > self.max_bytes {
            return Err(AcquireError::TooLarge {
                size_bytes: actual,
                limit_bytes: self.max_bytes,
            });
        }

        if self.in_memory {
            debug!(name = %descriptor.name, size_bytes = actual, "Acquired clip in memory");
            return Ok(StagedAsset {
                descriptor,
                content,
                transient: None,
            });
        }

        let extension = descriptor.extension();
        let handle = self
            .staging
            .stage(extension.as_deref(), content.clone())
            .await
            .map_err(AcquireError::Staging)?;

        debug!(
            name = %descriptor.name,
            size_bytes = actual,
            staged = %handle.path().display(),
            "Acquired clip via staged copy"
        );

        Ok(StagedAsset {
            descriptor,
            content,
            transient: Some(handle),
        })
    }
}
