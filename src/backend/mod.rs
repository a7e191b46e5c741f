pub mod memory;
pub mod worker;

#[cfg(feature = "network")]
pub mod http;

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::progress_index::{ProgressRecord, WordId, WordUpdate};
use crate::error::NetworkError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub chapter_id: u64,
    pub page_number: u32,
    pub content: String,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Two-letter language code from a tag such as `en-US`.
pub fn language_code(tag: &str) -> String {
    tag.trim().chars().take(2).collect::<String>().to_ascii_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl TranslateRequest {
    pub fn new(text: &str, source: &str, target: &str) -> Self {
        Self {
            text: text.to_string(),
            source_lang: language_code(source),
            target_lang: language_code(target),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub translation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub dictionary_id: u64,
    pub word: String,
    pub translation: String,
}

/// Everything the reader needs from the server. Shared by concurrent
/// request threads.
pub trait Backend: Send + Sync {
    fn fetch_page(&self, chapter_id: u64, page_number: u32) -> Result<Page, NetworkError>;
    fn fetch_progress_list(&self, dictionary_id: u64) -> Result<Vec<ProgressRecord>, NetworkError>;
    fn fetch_word_by_id(&self, word_id: WordId) -> Result<ProgressRecord, NetworkError>;
    fn translate(&self, request: &TranslateRequest) -> Result<Translation, NetworkError>;
    fn update_word(&self, update: &WordUpdate) -> Result<ProgressRecord, NetworkError>;
    fn delete_word(&self, word_id: WordId) -> Result<WordId, NetworkError>;
    fn create_word(&self, word: &NewWord) -> Result<ProgressRecord, NetworkError>;
}

/// Text-to-speech. Callers never wait on it.
pub trait Speech {
    fn speak(&self, text: &str, lang: &str);
}

/// Speech for terminals without an audio engine: records the request in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSpeech;

impl Speech for LogSpeech {
    fn speak(&self, text: &str, lang: &str) {
        info!("speak [{}] {text}", language_code(lang));
    }
}
