use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::backend::{Backend, NewWord, Page, TranslateRequest, Translation};
use crate::engine::progress_index::{
    MAX_PROGRESS, ProgressRecord, WordId, WordUpdate, normalize_word,
};
use crate::error::NetworkError;

#[derive(Default)]
struct State {
    pages: HashMap<(u64, u32), String>,
    words: BTreeMap<WordId, (u64, ProgressRecord)>,
    glossary: HashMap<String, String>,
}

/// Backend kept entirely in memory. Used for offline reading of local files
/// and in tests.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

fn not_found(what: String) -> NetworkError {
    NetworkError::Status {
        status: 404,
        message: what,
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, chapter_id: u64, page_number: u32, content: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .pages
                .insert((chapter_id, page_number), content.to_string());
        }
        self
    }

    pub fn with_word(self, dictionary_id: u64, record: ProgressRecord) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.words.insert(record.id, (dictionary_id, record));
        }
        self
    }

    pub fn with_translation(self, text: &str, translation: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .glossary
                .insert(normalize_word(text), translation.to_string());
        }
        self
    }

    pub fn word(&self, word_id: WordId) -> Option<ProgressRecord> {
        let state = self.state.lock().ok()?;
        state.words.get(&word_id).map(|(_, r)| r.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, NetworkError> {
        self.state
            .lock()
            .map_err(|_| NetworkError::Unavailable("memory backend poisoned".to_string()))
    }
}

impl Backend for MemoryBackend {
    fn fetch_page(&self, chapter_id: u64, page_number: u32) -> Result<Page, NetworkError> {
        let state = self.lock()?;
        let total_pages = state
            .pages
            .keys()
            .filter(|(chapter, _)| *chapter == chapter_id)
            .map(|(_, page)| *page)
            .max();
        let content = state
            .pages
            .get(&(chapter_id, page_number))
            .ok_or_else(|| not_found(format!("chapter {chapter_id} page {page_number}")))?;
        Ok(Page {
            chapter_id,
            page_number,
            content: content.clone(),
            total_pages,
        })
    }

    fn fetch_progress_list(&self, dictionary_id: u64) -> Result<Vec<ProgressRecord>, NetworkError> {
        let state = self.lock()?;
        Ok(state
            .words
            .values()
            .filter(|(dict, _)| *dict == dictionary_id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn fetch_word_by_id(&self, word_id: WordId) -> Result<ProgressRecord, NetworkError> {
        self.word(word_id)
            .ok_or_else(|| not_found(format!("word {word_id}")))
    }

    fn translate(&self, request: &TranslateRequest) -> Result<Translation, NetworkError> {
        let state = self.lock()?;
        state
            .glossary
            .get(&normalize_word(&request.text))
            .map(|t| Translation {
                translation: t.clone(),
            })
            .ok_or_else(|| {
                NetworkError::Unavailable(format!("no offline translation for \"{}\"", request.text))
            })
    }

    fn update_word(&self, update: &WordUpdate) -> Result<ProgressRecord, NetworkError> {
        let mut state = self.lock()?;
        let (_, record) = state
            .words
            .get_mut(&update.id)
            .ok_or_else(|| not_found(format!("word {}", update.id)))?;
        if let Some(count) = update.count {
            record.count = count;
        }
        if let Some(progress) = update.progress {
            record.progress = progress.min(MAX_PROGRESS);
        }
        if let Some(disabled) = update.highlight_disabled {
            record.highlight_disabled = disabled;
        }
        Ok(record.clone())
    }

    fn delete_word(&self, word_id: WordId) -> Result<WordId, NetworkError> {
        let mut state = self.lock()?;
        state
            .words
            .remove(&word_id)
            .map(|_| word_id)
            .ok_or_else(|| not_found(format!("word {word_id}")))
    }

    fn create_word(&self, word: &NewWord) -> Result<ProgressRecord, NetworkError> {
        let mut state = self.lock()?;
        let id = state.words.keys().next_back().map_or(1, |last| last + 1);
        let record = ProgressRecord {
            id,
            word: word.word.clone(),
            progress: 0,
            highlight_disabled: false,
            count: 0,
            translation: word.translation.clone(),
        };
        state.words.insert(id, (word.dictionary_id, record.clone()));
        state
            .glossary
            .entry(normalize_word(&word.word))
            .or_insert_with(|| word.translation.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: WordId, word: &str) -> ProgressRecord {
        ProgressRecord {
            id,
            word: word.to_string(),
            progress: 2,
            highlight_disabled: false,
            count: 3,
            translation: String::new(),
        }
    }

    #[test]
    fn test_progress_list_is_per_dictionary() {
        let backend = MemoryBackend::new()
            .with_word(1, record(1, "Baum"))
            .with_word(2, record(2, "arbre"));
        let list = backend.fetch_progress_list(1).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].word, "Baum");
    }

    #[test]
    fn test_update_applies_partial_fields() {
        let backend = MemoryBackend::new().with_word(1, record(1, "Baum"));
        let updated = backend
            .update_word(&WordUpdate {
                id: 1,
                count: Some(4),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.count, 4);
        assert_eq!(updated.progress, 2);
    }

    #[test]
    fn test_create_assigns_next_id() {
        let backend = MemoryBackend::new().with_word(1, record(7, "Baum"));
        let created = backend
            .create_word(&NewWord {
                dictionary_id: 1,
                word: "Haus".to_string(),
                translation: "house".to_string(),
            })
            .unwrap();
        assert_eq!(created.id, 8);
        assert_eq!(created.progress, 0);
    }

    #[test]
    fn test_missing_things_are_404() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.fetch_page(1, 1),
            Err(NetworkError::Status { status: 404, .. })
        ));
        assert!(matches!(
            backend.delete_word(3),
            Err(NetworkError::Status { status: 404, .. })
        ));
    }

    #[test]
    fn test_translate_uses_glossary() {
        let backend = MemoryBackend::new().with_translation("Guten Tag", "good day");
        let req = TranslateRequest::new("guten tag", "de", "en");
        assert_eq!(backend.translate(&req).unwrap().translation, "good day");
        let missing = TranslateRequest::new("Tschüss", "de", "en");
        assert!(backend.translate(&missing).is_err());
    }
}
