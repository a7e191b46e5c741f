use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::language_code;
use crate::session::word_detail::{AwaitConfirmation, CommitPolicy, FireAndForget};

/// When a word detail commit reaches the local Progress Index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    #[default]
    FireAndForget,
    Await,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub native_language: Option<String>,
    #[serde(default = "default_book_language")]
    pub book_language: String,
    #[serde(default = "default_dictionary_id")]
    pub dictionary_id: u64,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub commit_mode: CommitMode,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_book_language() -> String {
    "en".to_string()
}
fn default_dictionary_id() -> u64 {
    1
}
fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_token: None,
            native_language: None,
            book_language: default_book_language(),
            dictionary_id: default_dictionary_id(),
            theme: default_theme(),
            commit_mode: CommitMode::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Write the settings to the config file. Returns where they went.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexiread")
            .join("config.toml")
    }

    /// Normalize values loaded from an older or hand-edited file.
    /// Language tags are cut to two-letter codes, blank values fall back
    /// to their defaults.
    pub fn validate(&mut self, known_themes: &[String]) {
        self.book_language = language_code(&self.book_language);
        if self.book_language.is_empty() {
            self.book_language = default_book_language();
        }
        self.native_language = self
            .native_language
            .as_deref()
            .map(language_code)
            .filter(|code| !code.is_empty());
        self.api_token = self.api_token.take().filter(|t| !t.trim().is_empty());
        if self.backend_url.trim().is_empty() {
            self.backend_url = default_backend_url();
        }
        if !known_themes.iter().any(|t| *t == self.theme) {
            self.theme = default_theme();
        }
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 120);
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn commit_policy(&self) -> Box<dyn CommitPolicy> {
        match self.commit_mode {
            CommitMode::FireAndForget => Box::new(FireAndForget),
            CommitMode::Await => Box::new(AwaitConfirmation),
        }
    }
}
