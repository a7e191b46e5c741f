use thiserror::Error;

/// Input the reader gave us that we refuse to act on. Surfaced as a notice.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("selection is {len} characters long, the limit is {max}")]
    SelectionTooLong { len: usize, max: usize },
    #[error("set a native language in the config before translating")]
    MissingNativeLanguage,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Failure talking to the backend or the translation service.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// An operation that does not apply to the current workflow state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("word has no id")]
    MissingWordId,
    #[error("no word detail is open")]
    NoOpenSession,
    #[error("no translation dialog is open")]
    NoSelection,
    #[error("\"{0}\" is not in the dictionary yet")]
    NotTracked(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    State(#[from] StateError),
}
