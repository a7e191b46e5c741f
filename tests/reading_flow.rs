use std::ops::Range;

use lexiread::app::App;
use lexiread::backend::LogSpeech;
use lexiread::backend::memory::MemoryBackend;
use lexiread::backend::worker::{Request, Response, execute};
use lexiread::config::{CommitMode, Config};
use lexiread::engine::highlight::{Highlight, resolve_highlight};
use lexiread::engine::progress_index::ProgressRecord;
use lexiread::session::selection::{Anchor, TranslationStatus};
use lexiread::session::word_detail::{CloseReason, Direction};
use lexiread::store::json_store::JsonStore;
use lexiread::ui::components::reading_area::PageGesture;
use lexiread::ui::theme::Theme;
use ratatui::layout::Rect;
use tempfile::TempDir;

const PAGE: &str = "Der Baum steht vor dem Haus.\nDer Hund schläft.";
const DICTIONARY: u64 = 1;

fn record(id: u64, word: &str, progress: u8, count: u32) -> ProgressRecord {
    ProgressRecord {
        id,
        word: word.to_string(),
        progress,
        highlight_disabled: false,
        count,
        translation: format!("{word}-en"),
    }
}

fn backend() -> MemoryBackend {
    MemoryBackend::new()
        .with_word(DICTIONARY, record(1, "baum", 4, 5))
        .with_word(DICTIONARY, record(2, "hund", 10, 2))
        .with_translation("Haus", "house")
        .with_translation("steht", "stands")
        .with_translation("Der Hund", "the dog")
}

fn config(mode: CommitMode) -> Config {
    let mut config = Config::default();
    config.dictionary_id = DICTIONARY;
    config.book_language = "de".to_string();
    config.native_language = Some("en-US".to_string());
    config.commit_mode = mode;
    config
}

fn open_app(mode: CommitMode, store: Option<JsonStore>, backend: &MemoryBackend) -> App {
    let mut app = App::new(config(mode), Theme::default(), store, Box::new(LogSpeech));
    app.resize(Rect::new(0, 0, 80, 24));
    app.load_text("fixture", PAGE.to_string());
    pump(&mut app, backend);
    app
}

/// Run every queued request against `backend` until nothing is left.
fn pump(app: &mut App, backend: &MemoryBackend) {
    loop {
        let requests = app.take_requests();
        if requests.is_empty() {
            break;
        }
        for request in requests {
            app.handle_response(execute(backend, request));
        }
    }
}

fn range_of(word: &str) -> Range<usize> {
    let start = PAGE.find(word).unwrap();
    start..start + word.len()
}

fn click(app: &mut App, word: &str) {
    app.on_gesture(PageGesture::WordClick {
        word: range_of(word),
        anchor: Anchor { line: 0, col: 0 },
    });
}

#[test]
fn test_progress_list_drives_highlights() {
    let backend = backend();
    let app = open_app(CommitMode::FireAndForget, None, &backend);

    assert_eq!(app.index.len(), 2);
    assert_eq!(
        resolve_highlight("Baum", &app.index),
        Some(Highlight::Progress(4))
    );
    assert_eq!(resolve_highlight("Haus", &app.index), None);
}

#[test]
fn test_translate_and_add_to_dictionary() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "Haus");
    assert_eq!(app.selection.status(), Some(TranslationStatus::Pending));
    pump(&mut app, &backend);
    assert_eq!(
        app.selection.status(),
        Some(TranslationStatus::Ready("house"))
    );

    app.add_to_dictionary();
    assert!(app.selection.is_idle());
    pump(&mut app, &backend);

    let added = app.index.lookup("haus").expect("word tracked after creation");
    assert_eq!(added.progress, 0);
    assert_eq!(
        resolve_highlight("Haus", &app.index),
        Some(Highlight::Progress(0))
    );
}

#[test]
fn test_stale_translation_is_ignored() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "steht");
    let first = app.take_requests();
    // Selecting again while the dialog is up replaces the first selection.
    app.on_gesture(PageGesture::Select {
        range: range_of("Der Hund"),
        anchor: Anchor { line: 1, col: 0 },
    });
    let second = app.take_requests();

    // The newer selection answers first, the old one straggles in afterwards.
    for request in second.into_iter().chain(first) {
        app.handle_response(execute(&backend, request));
    }
    assert_eq!(
        app.selection.selection().map(|s| s.selected_text.as_str()),
        Some("Der Hund")
    );
    assert_eq!(
        app.selection.status(),
        Some(TranslationStatus::Ready("the dog"))
    );
}

#[test]
fn test_view_only_commit_sends_count() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "Baum");
    app.close_detail(CloseReason::Close);
    pump(&mut app, &backend);

    let saved = backend.word(1).unwrap();
    assert_eq!(saved.count, 6);
    assert_eq!(saved.progress, 4);
}

#[test]
fn test_adjust_commit_fire_and_forget() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "Baum");
    app.adjust_progress(Direction::Up);
    app.adjust_progress(Direction::Up);
    app.close_detail(CloseReason::Close);

    // Applied locally before the server has answered.
    assert_eq!(app.index.get(1).map(|r| r.progress), Some(5));
    let requests = app.take_requests();
    assert_eq!(requests.len(), 1);
    for request in requests {
        app.handle_response(execute(&backend, request));
    }

    let saved = backend.word(1).unwrap();
    assert_eq!((saved.count, saved.progress), (7, 5));
    assert_eq!(app.index.get(1).map(|r| r.count), Some(7));
}

#[test]
fn test_adjust_commit_await_confirmation() {
    let backend = backend();
    let mut app = open_app(CommitMode::Await, None, &backend);

    click(&mut app, "Baum");
    app.adjust_progress(Direction::Down);
    app.close_detail(CloseReason::Backdrop);
    assert_eq!(app.index.get(1).map(|r| r.progress), Some(4));

    pump(&mut app, &backend);
    assert_eq!(app.index.get(1).map(|r| r.progress), Some(3));
}

#[test]
fn test_failed_commit_is_not_fatal() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "Baum");
    app.close_detail(CloseReason::Close);
    let requests = app.take_requests();
    let [Request::UpdateWord(update)] = requests.as_slice() else {
        panic!("expected an update, got {requests:?}");
    };
    app.handle_response(Response::WordUpdated {
        update: update.clone(),
        result: Err(lexiread::error::NetworkError::Transport("reset".to_string())),
    });

    assert!(app.detail.is_closed());
    assert_eq!(app.index.get(1).map(|r| r.count), Some(6));
    // Commit failures are only logged.
    assert!(app.notices.is_empty());
}

#[test]
fn test_delete_from_detail() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "Hund");
    app.add_detail_to_training();
    assert!(app.training.contains(2));
    app.delete_word();
    assert!(app.detail.is_closed());
    pump(&mut app, &backend);

    assert!(!app.index.is_tracked("hund"));
    assert!(backend.word(2).is_none());
    assert!(!app.training.contains(2));
}

#[test]
fn test_uncached_word_is_fetched() {
    let backend = backend().with_word(DICTIONARY, record(9, "dem", 1, 0));
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);
    app.index.remove(9);

    app.open_detail(Some(9));
    assert!(matches!(
        app.take_requests().as_slice(),
        [Request::FetchWord { word_id: 9 }]
    ));
    app.handle_response(execute(&backend, Request::FetchWord { word_id: 9 }));

    assert_eq!(app.detail.session().map(|s| s.local_count), Some(1));
    assert!(app.index.is_tracked("dem"));
}

#[test]
fn test_training_queue_survives_restart() {
    let dir = TempDir::new().unwrap();
    let backend = backend();

    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    let mut app = open_app(CommitMode::FireAndForget, Some(store), &backend);
    click(&mut app, "Baum");
    app.add_detail_to_training();
    app.add_detail_to_training();
    app.close_detail(CloseReason::Close);
    pump(&mut app, &backend);
    app.quit();

    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    let reopened = App::new(
        config(CommitMode::FireAndForget),
        Theme::default(),
        Some(store),
        Box::new(LogSpeech),
    );
    assert_eq!(reopened.training.len(), 1);
    assert_eq!(reopened.training.words()[0].word, "baum");
    // Cached progress is available before any backend call.
    assert!(reopened.index.is_tracked("Baum"));
}

#[test]
fn test_selection_from_dialog_needs_dictionary_word() {
    let backend = backend();
    let mut app = open_app(CommitMode::FireAndForget, None, &backend);

    click(&mut app, "Haus");
    pump(&mut app, &backend);
    app.add_selection_to_training();
    assert!(app.training.is_empty());
    assert!(app.notices.latest().is_some());
}
