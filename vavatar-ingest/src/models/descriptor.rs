//! File selection descriptors

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, immutable clip content
///
/// Cloning is a reference-count bump, so the same bytes can sit in a
/// pending entry and in an output record during commit.
pub type ClipBytes = Arc<[u8]>;

/// One user-chosen file, prior to validation
///
/// Produced by the file picker and never mutated afterwards. At least
/// one of `raw_bytes` / `source_path` must resolve to content; bytes win
/// when both are present.
#[derive(Debug, Clone)]
pub struct SelectionDescriptor {
    /// File name as shown by the picker (e.g. `intro.mp3`)
    pub name: String,
    /// Size reported by the picker
    pub size_bytes: u64,
    /// In-memory content, when the picker supplied it
    pub raw_bytes: Option<ClipBytes>,
    /// Host path to read the content from
    pub source_path: Option<PathBuf>,
}

impl SelectionDescriptor {
    /// Descriptor backed by in-memory bytes; size is the byte length
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<ClipBytes>) -> Self {
        let bytes: ClipBytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            raw_bytes: Some(bytes),
            source_path: None,
        }
    }

    /// Descriptor backed by a host path with a picker-reported size
    pub fn from_path(name: impl Into<String>, size_bytes: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            raw_bytes: None,
            source_path: Some(path.into()),
        }
    }

    /// Lower-cased file extension, used as a container hint
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}
