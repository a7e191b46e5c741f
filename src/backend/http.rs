use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::backend::{Backend, NewWord, Page, TranslateRequest, Translation};
use crate::engine::progress_index::{ProgressRecord, WordId, WordUpdate};
use crate::error::NetworkError;

/// JSON-over-HTTP client for the reading server.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct Deleted {
    id: WordId,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, NetworkError> {
        let response = builder
            .send()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(NetworkError::Status {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .map_err(|e| NetworkError::Decode(e.to_string()))
    }
}

impl Backend for HttpBackend {
    fn fetch_page(&self, chapter_id: u64, page_number: u32) -> Result<Page, NetworkError> {
        Self::send(self.request(
            Method::GET,
            &format!("chapters/{chapter_id}/pages/{page_number}"),
        ))
    }

    fn fetch_progress_list(&self, dictionary_id: u64) -> Result<Vec<ProgressRecord>, NetworkError> {
        Self::send(self.request(Method::GET, &format!("dictionaries/{dictionary_id}/words")))
    }

    fn fetch_word_by_id(&self, word_id: WordId) -> Result<ProgressRecord, NetworkError> {
        Self::send(self.request(Method::GET, &format!("words/{word_id}")))
    }

    fn translate(&self, request: &TranslateRequest) -> Result<Translation, NetworkError> {
        Self::send(self.request(Method::POST, "translate").json(request))
    }

    fn update_word(&self, update: &WordUpdate) -> Result<ProgressRecord, NetworkError> {
        Self::send(
            self.request(Method::PATCH, &format!("words/{}", update.id))
                .json(update),
        )
    }

    fn delete_word(&self, word_id: WordId) -> Result<WordId, NetworkError> {
        let deleted: Deleted =
            Self::send(self.request(Method::DELETE, &format!("words/{word_id}")))?;
        Ok(deleted.id)
    }

    fn create_word(&self, word: &NewWord) -> Result<ProgressRecord, NetworkError> {
        Self::send(
            self.request(
                Method::POST,
                &format!("dictionaries/{}/words", word.dictionary_id),
            )
            .json(word),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend =
            HttpBackend::new("http://localhost:8080/api/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_empty_token_is_dropped() {
        let backend = HttpBackend::new(
            "http://localhost",
            Some(String::new()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(backend.token.is_none());
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        let backend =
            HttpBackend::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap();
        assert!(matches!(
            backend.fetch_word_by_id(1),
            Err(NetworkError::Transport(_))
        ));
    }
}
