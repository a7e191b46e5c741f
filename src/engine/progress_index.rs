use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type WordId = u64;

pub const MAX_PROGRESS: u8 = 10;

/// Clamp any computed progress value into `0..=MAX_PROGRESS`.
pub fn clamp_progress(value: i32) -> u8 {
    value.clamp(0, MAX_PROGRESS as i32) as u8
}

/// Lookup key for a word: trimmed and lowercased.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: WordId,
    pub word: String,
    pub progress: u8,
    #[serde(default)]
    pub highlight_disabled: bool,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub translation: String,
}

/// Partial update for a word. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordUpdate {
    pub id: WordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_disabled: Option<bool>,
}

/// Progress records for the active dictionary, addressable by id and by
/// normalized word.
#[derive(Clone, Debug, Default)]
pub struct ProgressIndex {
    records: HashMap<WordId, ProgressRecord>,
    by_word: HashMap<String, WordId>,
}

impl ProgressIndex {
    pub fn from_records(records: impl IntoIterator<Item = ProgressRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.upsert(record);
        }
        index
    }

    /// Bulk load: drop everything and take the given records.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = ProgressRecord>) {
        self.records.clear();
        self.by_word.clear();
        for record in records {
            self.upsert(record);
        }
    }

    pub fn lookup(&self, word: &str) -> Option<&ProgressRecord> {
        let id = self.by_word.get(&normalize_word(word))?;
        self.records.get(id)
    }

    pub fn is_tracked(&self, word: &str) -> bool {
        self.lookup(word).is_some()
    }

    pub fn get(&self, id: WordId) -> Option<&ProgressRecord> {
        self.records.get(&id)
    }

    /// Insert or overwrite the record with this id. Progress is clamped.
    pub fn upsert(&mut self, mut record: ProgressRecord) {
        record.progress = record.progress.min(MAX_PROGRESS);
        let key = normalize_word(&record.word);

        if let Some(previous) = self.records.get(&record.id) {
            let old_key = normalize_word(&previous.word);
            if old_key != key && self.by_word.get(&old_key) == Some(&record.id) {
                self.by_word.remove(&old_key);
            }
        }

        self.by_word.insert(key, record.id);
        self.records.insert(record.id, record);
    }

    /// Overwrite the fields present in `update`. Returns false for unknown ids.
    pub fn apply(&mut self, update: &WordUpdate) -> bool {
        let Some(record) = self.records.get_mut(&update.id) else {
            return false;
        };
        if let Some(count) = update.count {
            record.count = count;
        }
        if let Some(progress) = update.progress {
            record.progress = progress.min(MAX_PROGRESS);
        }
        if let Some(disabled) = update.highlight_disabled {
            record.highlight_disabled = disabled;
        }
        true
    }

    pub fn remove(&mut self, id: WordId) -> Option<ProgressRecord> {
        let record = self.records.remove(&id)?;
        let key = normalize_word(&record.word);
        if self.by_word.get(&key) == Some(&id) {
            self.by_word.remove(&key);
            // Another record may share the normalized spelling.
            if let Some(other) = self
                .records
                .values()
                .filter(|r| normalize_word(&r.word) == key)
                .map(|r| r.id)
                .max()
            {
                self.by_word.insert(key, other);
            }
        }
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records ordered by id.
    pub fn snapshot(&self) -> Vec<ProgressRecord> {
        let mut records: Vec<ProgressRecord> = self.records.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }
}
