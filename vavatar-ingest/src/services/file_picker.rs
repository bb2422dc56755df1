//! File picker seam
//!
//! The picker is the only source of descriptors. An empty result means
//! the user dismissed the dialog.

use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

use crate::models::SelectionDescriptor;

/// File selection failures
#[derive(Debug, Error)]
pub enum PickError {
    #[error("File selection failed: {0}")]
    Failed(String),
}

/// Supplies selection descriptors for one batch
#[async_trait::async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick(&self) -> Result<Vec<SelectionDescriptor>, PickError>;
}

/// Descriptors chosen ahead of time (in-process callers, tests)
#[derive(Debug, Clone, Default)]
pub struct PreselectedPicker {
    descriptors: Vec<SelectionDescriptor>,
}

impl PreselectedPicker {
    pub fn new(descriptors: Vec<SelectionDescriptor>) -> Self {
        Self { descriptors }
    }
}

#[async_trait::async_trait]
impl FilePicker for PreselectedPicker {
    async fn pick(&self) -> Result<Vec<SelectionDescriptor>, PickError> {
        Ok(self.descriptors.clone())
    }
}

/// Descriptors for host paths
///
/// Paths that cannot be stat'ed still produce a descriptor (size 0) so
/// the batch counts them and skips them during acquisition.
#[derive(Debug, Clone, Default)]
pub struct PathPicker {
    paths: Vec<PathBuf>,
}

impl PathPicker {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

#[async_trait::async_trait]
impl FilePicker for PathPicker {
    async fn pick(&self) -> Result<Vec<SelectionDescriptor>, PickError> {
        let mut descriptors = Vec::with_capacity(self.paths.len());

        for path in &self.paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| path.display().to_string());

            let size_bytes = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat selected file");
                    0
                }
            };

            descriptors.push(SelectionDescriptor::from_path(name, size_bytes, path.clone()));
        }

        Ok(descriptors)
    }
}
