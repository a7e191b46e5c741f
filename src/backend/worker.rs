use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, warn};

use crate::backend::{Backend, NewWord, Page};
use crate::engine::progress_index::{ProgressRecord, WordId, WordUpdate};
use crate::error::NetworkError;
use crate::session::selection::{SessionToken, TranslationRequest};

/// Work for the backend thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    FetchPage { chapter_id: u64, page_number: u32 },
    FetchProgressList { dictionary_id: u64 },
    FetchWord { word_id: WordId },
    Translate(TranslationRequest),
    UpdateWord(WordUpdate),
    DeleteWord { word_id: WordId },
    CreateWord(NewWord),
}

/// A finished request. Each variant carries enough of the request to route
/// the answer back to whoever asked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Page {
        chapter_id: u64,
        page_number: u32,
        result: Result<Page, NetworkError>,
    },
    ProgressList {
        dictionary_id: u64,
        result: Result<Vec<ProgressRecord>, NetworkError>,
    },
    Word {
        word_id: WordId,
        result: Result<ProgressRecord, NetworkError>,
    },
    Translation {
        token: SessionToken,
        result: Result<String, NetworkError>,
    },
    WordUpdated {
        update: WordUpdate,
        result: Result<ProgressRecord, NetworkError>,
    },
    WordDeleted {
        word_id: WordId,
        result: Result<WordId, NetworkError>,
    },
    WordCreated {
        word: NewWord,
        result: Result<ProgressRecord, NetworkError>,
    },
}

/// Run one request to completion against `backend`.
pub fn execute(backend: &dyn Backend, request: Request) -> Response {
    match request {
        Request::FetchPage {
            chapter_id,
            page_number,
        } => Response::Page {
            chapter_id,
            page_number,
            result: backend.fetch_page(chapter_id, page_number),
        },
        Request::FetchProgressList { dictionary_id } => Response::ProgressList {
            dictionary_id,
            result: backend.fetch_progress_list(dictionary_id),
        },
        Request::FetchWord { word_id } => Response::Word {
            word_id,
            result: backend.fetch_word_by_id(word_id),
        },
        Request::Translate(TranslationRequest { token, request }) => Response::Translation {
            token,
            result: backend.translate(&request).map(|t| t.translation),
        },
        Request::UpdateWord(update) => {
            let result = backend.update_word(&update);
            Response::WordUpdated { update, result }
        }
        Request::DeleteWord { word_id } => Response::WordDeleted {
            word_id,
            result: backend.delete_word(word_id),
        },
        Request::CreateWord(word) => {
            let result = backend.create_word(&word);
            Response::WordCreated { word, result }
        }
    }
}

type Deliver = dyn Fn(Response) -> bool + Send + Sync;

/// Runs every request on its own thread so a slow call never holds back the
/// others. Answers go to `deliver` in completion order.
pub struct RequestWorker {
    backend: Arc<dyn Backend>,
    deliver: Arc<Deliver>,
    stopped: Arc<AtomicBool>,
}

impl RequestWorker {
    /// `deliver` returns false once nobody is listening; later requests are
    /// then dropped.
    pub fn spawn<B, F>(backend: B, deliver: F) -> Self
    where
        B: Backend + 'static,
        F: Fn(Response) -> bool + Send + Sync + 'static,
    {
        Self {
            backend: Arc::new(backend),
            deliver: Arc::new(deliver),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn submit(&self, request: Request) {
        if self.stopped.load(Ordering::Relaxed) {
            warn!("backend worker has stopped, request dropped");
            return;
        }
        debug!("backend request: {request:?}");

        let backend = Arc::clone(&self.backend);
        let deliver = Arc::clone(&self.deliver);
        let stopped = Arc::clone(&self.stopped);
        let spawned = thread::Builder::new()
            .name("backend-request".to_string())
            .spawn(move || {
                if !deliver(execute(backend.as_ref(), request)) {
                    stopped.store(true, Ordering::Relaxed);
                }
            });
        if let Err(e) = spawned {
            warn!("could not start backend request thread: {e}");
        }
    }
}
