//! In-memory store for tests

use std::sync::{Arc, Mutex};

use super::{ChannelSummary, FrameStore, StoreError};
use crate::frame::FrameRecord;

/// Records rows and summaries in shared vectors; fails every insert whose
/// PSDU equals `fail_psdu`
#[derive(Default, Clone)]
pub struct MemoryStore {
    pub rows: Arc<Mutex<Vec<(String, FrameRecord)>>>,
    pub summaries: Arc<Mutex<Vec<ChannelSummary>>>,
    pub fail_psdu: Option<String>,
}

impl MemoryStore {
    pub fn records(&self) -> Vec<FrameRecord> {
        self.rows.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

impl FrameStore for MemoryStore {
    fn prepare_table(&mut self, _table: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn insert_frame(&mut self, table: &str, record: &FrameRecord) -> Result<(), StoreError> {
        if self.fail_psdu.as_deref() == Some(record.psdu.as_str()) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        self.rows.lock().unwrap().push((table.to_string(), record.clone()));
        Ok(())
    }

    fn upsert_summary(&mut self, summary: &ChannelSummary) -> Result<(), StoreError> {
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(())
    }
}
