use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::engine::progress_index::{ProgressRecord, WordId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingWord {
    pub id: WordId,
    pub word: String,
    pub translation: String,
}

impl From<&ProgressRecord> for TrainingWord {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            id: record.id,
            word: record.word.clone(),
            translation: record.translation.clone(),
        }
    }
}

/// Words picked for the next training session, unique by id, in the order
/// they were first added.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingQueue {
    words: Vec<TrainingWord>,
}

impl TrainingQueue {
    /// Append the words whose ids are not queued yet. Returns how many were added.
    pub fn add_words(&mut self, words: impl IntoIterator<Item = TrainingWord>) -> usize {
        let mut seen: HashSet<WordId> = self.words.iter().map(|w| w.id).collect();
        let before = self.words.len();
        for word in words {
            if seen.insert(word.id) {
                self.words.push(word);
            }
        }
        self.words.len() - before
    }

    pub fn remove_word(&mut self, id: WordId) -> bool {
        let before = self.words.len();
        self.words.retain(|w| w.id != id);
        self.words.len() != before
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn contains(&self, id: WordId) -> bool {
        self.words.iter().any(|w| w.id == id)
    }

    pub fn words(&self) -> &[TrainingWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
