use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::progress_index::ProgressRecord;
use crate::session::training::TrainingQueue;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingQueueData {
    pub schema_version: u32,
    pub queue: TrainingQueue,
}

impl Default for TrainingQueueData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            queue: TrainingQueue::default(),
        }
    }
}

impl TrainingQueueData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

/// Last Progress Index seen for a dictionary. Lets highlights render before
/// the backend list arrives; the backend list always replaces it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressCacheData {
    pub schema_version: u32,
    pub dictionary_id: u64,
    pub saved_at: Option<DateTime<Utc>>,
    pub records: Vec<ProgressRecord>,
}

impl Default for ProgressCacheData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            dictionary_id: 0,
            saved_at: None,
            records: Vec::new(),
        }
    }
}

impl ProgressCacheData {
    pub fn new(dictionary_id: u64, records: Vec<ProgressRecord>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            dictionary_id,
            saved_at: Some(Utc::now()),
            records,
        }
    }

    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }

    /// Records usable for `dictionary_id`, empty when the cache is stale or
    /// belongs to another dictionary.
    pub fn records_for(self, dictionary_id: u64) -> Vec<ProgressRecord> {
        if self.needs_reset() || self.dictionary_id != dictionary_id {
            Vec::new()
        } else {
            self.records
        }
    }
}
