use std::ops::Range;
use std::time::Instant;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use log::{debug, info, warn};
use ratatui::layout::{Position, Rect};
use ratatui::widgets::Block;

use crate::backend::worker::{Request, Response};
use crate::backend::{NewWord, Page, Speech};
use crate::config::Config;
use crate::engine::highlight::HighlightPalette;
use crate::engine::progress_index::ProgressIndex;
use crate::error::{EngineError, NetworkError, StateError};
use crate::notice::Notices;
use crate::session::selection::{Anchor, Languages, SelectionWorkflow, WordClickOutcome};
use crate::session::training::{TrainingQueue, TrainingWord};
use crate::session::word_detail::{
    AdjustRejected, CloseReason, Direction, OpenOutcome, WordDetailFlow, reconcile_delete,
};
use crate::store::json_store::JsonStore;
use crate::store::schema::{ProgressCacheData, SCHEMA_VERSION, TrainingQueueData};
use crate::text::tokenize;
use crate::ui::components::reading_area::{Hit, PageGesture, PageLayout, PointerTracker};
use crate::ui::components::translation_dialog::{DIALOG_HEIGHT, DIALOG_WIDTH};
use crate::ui::components::word_detail::{DETAIL_HEIGHT, DETAIL_WIDTH};
use crate::ui::layout::{AppLayout, centered_rect, popup_near};
use crate::ui::theme::Theme;

/// Where the page text comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageSource {
    Remote { chapter_id: u64 },
    Local { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageView {
    Empty,
    Loading { chapter_id: u64, page_number: u32 },
    Ready(Page),
    Failed(NetworkError),
}

/// All reader state. Lives on the UI thread; backend work leaves through the
/// outbox as `Request`s and comes back through `handle_response`.
pub struct App {
    pub config: Config,
    pub theme: &'static Theme,
    pub palette: HighlightPalette,
    pub languages: Languages,
    pub index: ProgressIndex,
    pub selection: SelectionWorkflow,
    pub detail: WordDetailFlow,
    pub training: TrainingQueue,
    pub source: PageSource,
    pub page: PageView,
    pub layout: PageLayout,
    pub scroll: u16,
    pub pointer: PointerTracker,
    /// Keyboard word cursor.
    pub cursor: Option<Range<usize>>,
    /// Start of a keyboard selection.
    pub mark: Option<Range<usize>>,
    /// Page range of the selection being translated.
    pub selected_range: Option<Range<usize>>,
    pub show_training: bool,
    pub notices: Notices,
    pub store: Option<JsonStore>,
    pub should_quit: bool,
    frame: Rect,
    outbox: Vec<Request>,
    speech: Box<dyn Speech>,
}

impl App {
    pub fn new(
        config: Config,
        theme: Theme,
        store: Option<JsonStore>,
        speech: Box<dyn Speech>,
    ) -> Self {
        let theme: &'static Theme = Box::leak(Box::new(theme));
        let palette = HighlightPalette::from_theme(theme);
        let languages = Languages {
            book: config.book_language.clone(),
            native: config.native_language.clone(),
        };

        let (training, cached) = match &store {
            Some(s) => (
                s.load_training_queue().queue,
                s.load_progress_cache().records_for(config.dictionary_id),
            ),
            None => (TrainingQueue::default(), Vec::new()),
        };
        if !cached.is_empty() {
            debug!("seeding progress index with {} cached records", cached.len());
        }

        Self {
            detail: WordDetailFlow::new(config.commit_policy()),
            config,
            theme,
            palette,
            languages,
            index: ProgressIndex::from_records(cached),
            selection: SelectionWorkflow::new(),
            training,
            source: PageSource::Local {
                name: String::new(),
            },
            page: PageView::Empty,
            layout: PageLayout::default(),
            scroll: 0,
            pointer: PointerTracker::default(),
            cursor: None,
            mark: None,
            selected_range: None,
            show_training: true,
            notices: Notices::default(),
            store,
            should_quit: false,
            frame: Rect::default(),
            outbox: Vec::new(),
            speech,
        }
    }

    /// Ask for the progress list and the first page of a chapter.
    pub fn start(&mut self, chapter_id: u64, page_number: u32) {
        info!("opening chapter {chapter_id} page {page_number}");
        self.source = PageSource::Remote { chapter_id };
        self.refresh_progress();
        self.go_to_page(chapter_id, page_number);
    }

    /// Show a local text as a single page.
    pub fn load_text(&mut self, name: &str, content: String) {
        info!("opening local text {name} ({} bytes)", content.len());
        self.source = PageSource::Local {
            name: name.to_string(),
        };
        self.refresh_progress();
        self.set_page(Page {
            chapter_id: 0,
            page_number: 1,
            content,
            total_pages: Some(1),
        });
    }

    pub fn refresh_progress(&mut self) {
        self.outbox.push(Request::FetchProgressList {
            dictionary_id: self.config.dictionary_id,
        });
    }

    /// Requests produced since the last call, in order.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    // --- page and layout ---

    fn go_to_page(&mut self, chapter_id: u64, page_number: u32) {
        self.page = PageView::Loading {
            chapter_id,
            page_number,
        };
        self.relayout();
        self.outbox.push(Request::FetchPage {
            chapter_id,
            page_number,
        });
    }

    fn set_page(&mut self, page: Page) {
        self.page = PageView::Ready(page);
        self.scroll = 0;
        self.cursor = None;
        self.mark = None;
        self.pointer.cancel();
        self.relayout();
    }

    pub fn page_content(&self) -> Option<&str> {
        match &self.page {
            PageView::Ready(page) => Some(&page.content),
            _ => None,
        }
    }

    fn page_text(&self, range: Range<usize>) -> Option<String> {
        self.page_content()?.get(range).map(str::to_string)
    }

    pub fn next_page(&mut self) {
        self.step_page(true);
    }

    pub fn prev_page(&mut self) {
        self.step_page(false);
    }

    fn step_page(&mut self, forward: bool) {
        let PageSource::Remote { chapter_id } = self.source else {
            self.notices.info("Local texts have a single page");
            return;
        };
        let PageView::Ready(page) = &self.page else {
            return;
        };
        let target = if forward {
            page.page_number.checked_add(1)
        } else {
            page.page_number.checked_sub(1).filter(|n| *n >= 1)
        };
        let in_range = |n: &u32| page.total_pages.is_none_or(|total| *n <= total);
        match target.filter(in_range) {
            Some(n) => self.go_to_page(chapter_id, n),
            None => self.notices.info(if forward {
                "Last page of the chapter"
            } else {
                "First page of the chapter"
            }),
        }
    }

    /// Record the terminal size. The page is re-wrapped when the text width changes.
    pub fn resize(&mut self, frame: Rect) {
        self.frame = frame;
        if self.text_area().width != self.layout.width() {
            self.relayout();
        }
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn app_layout(&self) -> AppLayout {
        AppLayout::new(self.frame, self.show_training)
    }

    /// Inside of the bordered reading block.
    pub fn text_area(&self) -> Rect {
        Block::bordered().inner(self.app_layout().main)
    }

    fn relayout(&mut self) {
        let width = self.text_area().width;
        self.layout = match &self.page {
            PageView::Ready(page) => PageLayout::build(&tokenize(&page.content), width),
            _ => PageLayout::default(),
        };
        self.clamp_scroll();
    }

    fn max_scroll(&self) -> u16 {
        let visible = self.text_area().height as usize;
        self.layout.line_count().saturating_sub(visible) as u16
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let target = (self.scroll as i32 + delta).max(0) as u16;
        self.scroll = target.min(self.max_scroll());
    }

    pub fn toggle_training(&mut self) {
        self.show_training = !self.show_training;
        self.relayout();
    }

    // --- keyboard navigation ---

    fn word_ranges(&self) -> Vec<Range<usize>> {
        self.page_content()
            .map(|content| {
                tokenize(content)
                    .iter()
                    .filter(|t| t.is_word())
                    .map(|t| t.range())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn move_cursor(&mut self, forward: bool) {
        let words = self.word_ranges();
        let next = match &self.cursor {
            None if forward => words.first(),
            None => words.last(),
            Some(cur) if forward => words.iter().find(|w| w.start > cur.start).or(words.last()),
            Some(cur) => words
                .iter()
                .rev()
                .find(|w| w.start < cur.start)
                .or(words.first()),
        };
        self.cursor = next.cloned();
        self.scroll_to_cursor();
    }

    fn scroll_to_cursor(&mut self) {
        let Some(anchor) = self.cursor.as_ref().and_then(|c| self.layout.anchor_of(c.start))
        else {
            return;
        };
        let visible = self.text_area().height.max(1) as usize;
        let scroll = self.scroll as usize;
        if anchor.line < scroll {
            self.scroll = anchor.line as u16;
        } else if anchor.line >= scroll + visible {
            self.scroll = (anchor.line + 1 - visible) as u16;
        }
    }

    pub fn toggle_mark(&mut self) {
        self.mark = match self.mark {
            Some(_) => None,
            None => self.cursor.clone(),
        };
    }

    /// Enter on the page: translate the marked span, or click the word under
    /// the cursor.
    pub fn activate_cursor(&mut self) {
        let Some(cursor) = self.cursor.clone() else {
            return;
        };
        match self.mark.take() {
            Some(mark) => {
                let range = mark.start.min(cursor.start)..mark.end.max(cursor.end);
                let anchor = self.layout.anchor_of(range.start);
                self.select_range(range, anchor);
            }
            None => {
                let anchor = self.layout.anchor_of(cursor.start);
                self.click_word_range(cursor, anchor);
            }
        }
    }

    /// Span to paint as selected: a live drag, a pending keyboard mark, or
    /// the selection currently being translated.
    pub fn display_selection(&self) -> Option<Range<usize>> {
        if let Some(live) = self.pointer.live_range() {
            return Some(live);
        }
        if let (Some(mark), Some(cursor)) = (&self.mark, &self.cursor) {
            return Some(mark.start.min(cursor.start)..mark.end.max(cursor.end));
        }
        if self.selection.is_idle() {
            None
        } else {
            self.selected_range.clone()
        }
    }

    // --- mouse ---

    fn hit_at(&self, column: u16, row: u16) -> Option<(Hit, Anchor)> {
        let area = self.text_area();
        if !area.contains(Position::new(column, row)) {
            return None;
        }
        let line = (row - area.y) as usize + self.scroll as usize;
        let col = column - area.x;
        let hit = self.layout.hit_test(self.page_content()?, line, col)?;
        Some((hit, Anchor { line, col }))
    }

    pub fn modal_open(&self) -> bool {
        !self.detail.is_closed() || !self.selection.is_idle()
    }

    /// Screen rect of whichever modal is showing.
    pub fn modal_area(&self) -> Option<Rect> {
        if !self.detail.is_closed() {
            return Some(centered_rect(DETAIL_WIDTH, DETAIL_HEIGHT, self.frame));
        }
        let selection = self.selection.selection()?;
        Some(popup_near(
            selection.anchor,
            self.scroll,
            self.text_area(),
            self.frame,
            DIALOG_WIDTH,
            DIALOG_HEIGHT,
        ))
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        let (column, row) = (mouse.column, mouse.row);

        let at = Position::new(column, row);
        if !self.detail.is_closed() {
            if let MouseEventKind::Down(MouseButton::Left) = mouse.kind
                && let Some(area) = self.modal_area()
                && !area.contains(at)
            {
                self.close_detail(CloseReason::Backdrop);
            }
            return;
        }
        // The translation dialog is not modal for the page: a new click or
        // drag replaces the current selection.
        if !self.selection.is_idle()
            && let MouseEventKind::Down(MouseButton::Left) = mouse.kind
        {
            if self.modal_area().is_some_and(|area| area.contains(at)) {
                return;
            }
            if !self.text_area().contains(at) {
                self.close_dialog();
                return;
            }
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => match self.hit_at(column, row) {
                Some((hit, anchor)) => self.pointer.press(hit, anchor),
                None => self.pointer.cancel(),
            },
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some((hit, _)) = self.hit_at(column, row) {
                    self.pointer.drag(hit);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let hit = self.hit_at(column, row).map(|(hit, _)| hit);
                if let Some(gesture) = self.pointer.release(hit) {
                    self.on_gesture(gesture);
                }
            }
            MouseEventKind::ScrollDown => self.scroll_by(3),
            MouseEventKind::ScrollUp => self.scroll_by(-3),
            _ => {}
        }
    }

    pub fn on_gesture(&mut self, gesture: PageGesture) {
        match gesture {
            PageGesture::WordClick { word, anchor } => {
                self.cursor = Some(word.clone());
                self.click_word_range(word, Some(anchor));
            }
            PageGesture::Select { range, anchor } => self.select_range(range, Some(anchor)),
        }
    }

    // --- selection and translation ---

    fn select_range(&mut self, range: Range<usize>, anchor: Option<Anchor>) {
        let Some(text) = self.page_text(range.clone()) else {
            return;
        };
        match self.selection.select_text(&text, anchor, &self.languages) {
            Ok(Some(request)) => {
                self.selected_range = Some(range);
                self.outbox.push(Request::Translate(request));
            }
            Ok(None) => {}
            Err(e) => {
                self.selected_range = None;
                self.report(e.into());
            }
        }
    }

    fn click_word_range(&mut self, range: Range<usize>, anchor: Option<Anchor>) {
        let Some(word) = self.page_text(range.clone()) else {
            return;
        };
        match self
            .selection
            .click_word(&word, anchor, &self.index, &self.languages)
        {
            Ok(WordClickOutcome::Translate(request)) => {
                self.selected_range = Some(range);
                self.outbox.push(Request::Translate(request));
            }
            Ok(WordClickOutcome::OpenDetail(word_id)) => {
                self.selected_range = None;
                self.open_detail(Some(word_id));
            }
            Err(e) => {
                self.selected_range = None;
                self.report(e.into());
            }
        }
    }

    pub fn close_dialog(&mut self) {
        if self.selection.close().is_some() {
            debug!("translation dialog closed");
        }
        self.selected_range = None;
    }

    pub fn add_to_dictionary(&mut self) {
        match self.selection.add_to_dictionary() {
            Ok(vocabulary) => {
                self.selected_range = None;
                self.outbox.push(Request::CreateWord(NewWord {
                    dictionary_id: self.config.dictionary_id,
                    word: vocabulary.word,
                    translation: vocabulary.translation,
                }));
            }
            Err(e) => self.report(e),
        }
    }

    /// Queue the dialog's text for training. Only dictionary words have the
    /// id a training entry needs.
    pub fn add_selection_to_training(&mut self) {
        let Some(text) = self.selection.selection().map(|s| s.selected_text.clone()) else {
            self.report(StateError::NoSelection.into());
            return;
        };
        let Some(word) = self.index.lookup(&text).map(TrainingWord::from) else {
            self.report(StateError::NotTracked(text).into());
            return;
        };
        self.queue_training(word);
    }

    pub fn speak_selection(&mut self) {
        if let Some(selection) = self.selection.selection() {
            self.speech
                .speak(&selection.selected_text, &self.languages.book);
        }
    }

    // --- word detail ---

    pub fn open_detail(&mut self, word_id: Option<u64>) {
        match self.detail.open(word_id, &self.index) {
            Ok(OpenOutcome::Opened) => {}
            Ok(OpenOutcome::Fetch(word_id)) => self.outbox.push(Request::FetchWord { word_id }),
            Err(e) => self.report(e.into()),
        }
    }

    pub fn adjust_progress(&mut self, direction: Direction) {
        match self.detail.adjust(direction) {
            Ok(progress) => debug!("progress moved to {progress}"),
            Err(AdjustRejected::AlreadyAdjusted) => {
                self.notices.info("Progress can change once per visit")
            }
            Err(AdjustRejected::OutOfRange) => self.notices.info("Progress is already at the limit"),
            Err(AdjustRejected::NotOpen) => {}
        }
    }

    pub fn toggle_highlight(&mut self) {
        if let Err(e) = self.detail.toggle_highlight() {
            self.report(e.into());
        }
    }

    /// Close the detail and send its commit. `Edit` then re-translates the word.
    pub fn close_detail(&mut self, reason: CloseReason) {
        let Some(closed) = self.detail.close(reason, &mut self.index) else {
            return;
        };
        self.outbox.push(Request::UpdateWord(closed.update));

        if reason == CloseReason::Edit {
            match self
                .selection
                .translate_word(&closed.word, None, &self.languages)
            {
                Ok(request) => self.outbox.push(Request::Translate(request)),
                Err(e) => self.report(e.into()),
            }
        }
    }

    pub fn delete_word(&mut self) {
        match self.detail.delete() {
            Ok(word_id) => self.outbox.push(Request::DeleteWord { word_id }),
            Err(e) => self.report(e.into()),
        }
    }

    pub fn add_detail_to_training(&mut self) {
        let Some(session) = self.detail.session() else {
            self.report(StateError::NoOpenSession.into());
            return;
        };
        let word = TrainingWord {
            id: session.word_id,
            word: session.word.clone(),
            translation: session.translation.clone(),
        };
        self.queue_training(word);
    }

    pub fn speak_detail(&mut self) {
        if let Some(session) = self.detail.session() {
            self.speech.speak(&session.word, &self.languages.book);
        }
    }

    fn queue_training(&mut self, word: TrainingWord) {
        let text = word.word.clone();
        if self.training.add_words([word]) == 0 {
            self.notices.info(format!("\"{text}\" is already queued"));
            return;
        }
        self.notices.info(format!("Queued \"{text}\" for training"));
        self.save_training();
    }

    pub fn remove_from_training(&mut self, word_id: u64) {
        if self.training.remove_word(word_id) {
            self.save_training();
        }
    }

    pub fn clear_training(&mut self) {
        self.training.clear();
        self.save_training();
    }

    // --- backend answers ---

    pub fn handle_response(&mut self, response: Response) {
        match response {
            Response::Page {
                chapter_id,
                page_number,
                result,
            } => {
                let expected = PageView::Loading {
                    chapter_id,
                    page_number,
                };
                if self.page != expected {
                    debug!("dropping page {chapter_id}/{page_number}, no longer wanted");
                    return;
                }
                match result {
                    Ok(page) => self.set_page(page),
                    Err(e) => {
                        warn!("page {chapter_id}/{page_number} failed: {e}");
                        self.page = PageView::Failed(e);
                        self.relayout();
                    }
                }
            }
            Response::ProgressList {
                dictionary_id,
                result,
            } => {
                if dictionary_id != self.config.dictionary_id {
                    return;
                }
                match result {
                    Ok(records) => {
                        info!("loaded {} tracked words", records.len());
                        self.index.replace_all(records);
                        self.save_progress_cache();
                    }
                    Err(e) => self
                        .notices
                        .warn(format!("Could not load word progress: {e}")),
                }
            }
            Response::Word { word_id, result } => {
                self.detail.receive_word(word_id, result, &mut self.index);
            }
            Response::Translation { token, result } => {
                self.selection.receive_translation(token, result);
            }
            Response::WordUpdated { update, result } => {
                self.detail.on_commit_result(&mut self.index, &update, result);
            }
            Response::WordDeleted { word_id, result } => {
                match reconcile_delete(&mut self.index, word_id, result) {
                    Ok(id) => {
                        self.notices.info("Word deleted");
                        self.remove_from_training(id);
                    }
                    Err(e) => self.notices.error(format!("Delete failed: {e}")),
                }
            }
            Response::WordCreated { word, result } => match result {
                Ok(record) => {
                    self.notices.info(format!("Added \"{}\"", record.word));
                    self.index.upsert(record);
                }
                Err(e) => self
                    .notices
                    .error(format!("Could not add \"{}\": {e}", word.word)),
            },
        }
    }

    // --- misc ---

    /// Surface a workflow error as a notice.
    pub fn report(&mut self, error: EngineError) {
        match error {
            EngineError::Network(e) => self.notices.error(e.to_string()),
            other => self.notices.warn(other.to_string()),
        }
    }

    pub fn tick(&mut self) {
        self.notices.expire(Instant::now());
    }

    fn save_training(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        let data = TrainingQueueData {
            schema_version: SCHEMA_VERSION,
            queue: self.training.clone(),
        };
        if let Err(e) = store.save_training_queue(&data) {
            warn!("saving training queue failed: {e:#}");
            self.notices.error("Could not save the training queue");
        }
    }

    fn save_progress_cache(&self) {
        if let Some(store) = &self.store {
            let data = ProgressCacheData::new(self.config.dictionary_id, self.index.snapshot());
            if let Err(e) = store.save_progress_cache(&data) {
                warn!("saving progress cache failed: {e:#}");
            }
        }
    }

    pub fn save_data(&mut self) {
        self.save_training();
        self.save_progress_cache();
    }

    pub fn quit(&mut self) {
        self.save_data();
        self.should_quit = true;
    }
}
