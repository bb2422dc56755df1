//! Storage collaborators for commit tests

use std::sync::Mutex;
use vavatar_ingest::models::OutputRecord;
use vavatar_ingest::services::{ClipStore, StoreError};

/// Keeps every saved record; can be told to fail at a given save count
#[derive(Default)]
pub struct RecordingStore {
    saved: Mutex<Vec<OutputRecord>>,
    fail_when_saved: Mutex<Option<usize>>,
}

impl RecordingStore {
    /// Fail the save attempted once `count` records are stored
    pub fn fail_when_saved(&self, count: Option<usize>) {
        *self.fail_when_saved.lock().unwrap() = count;
    }

    pub fn saved(&self) -> Vec<OutputRecord> {
        self.saved.lock().unwrap().clone()
    }

    pub fn saved_names(&self) -> Vec<String> {
        self.saved().into_iter().map(|r| r.display_name).collect()
    }
}

#[async_trait::async_trait]
impl ClipStore for RecordingStore {
    async fn save(&self, record: &OutputRecord) -> Result<String, StoreError> {
        let mut saved = self.saved.lock().unwrap();
        if *self.fail_when_saved.lock().unwrap() == Some(saved.len()) {
            return Err(StoreError::Rejected("storage offline".to_string()));
        }
        saved.push(record.clone());
        Ok(format!("mem://clip/{}", saved.len()))
    }
}
