use log::{debug, info, warn};

use crate::backend::TranslateRequest;
use crate::engine::progress_index::{ProgressIndex, WordId};
use crate::error::{EngineError, NetworkError, StateError, ValidationError};
use crate::text::collapse_whitespace;

/// Longest selection, in characters, that is sent for translation.
pub const MAX_SELECTION_CHARS: usize = 999;

pub type SessionToken = u64;

/// Screen position a selection was made from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub line: usize,
    pub col: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_text: String,
    pub anchor: Option<Anchor>,
}

/// Book language and the reader's native language, as configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Languages {
    pub book: String,
    pub native: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    /// Translation requested, no answer yet.
    Selecting {
        token: SessionToken,
        selection: SelectionState,
    },
    DialogOpen {
        token: SessionToken,
        selection: SelectionState,
        result: Result<String, NetworkError>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslationStatus<'a> {
    Pending,
    Ready(&'a str),
    Failed(&'a NetworkError),
}

/// A translation the caller should send, tagged with the session it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationRequest {
    pub token: SessionToken,
    pub request: TranslateRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordClickOutcome {
    Translate(TranslationRequest),
    /// The word is tracked; inspect it instead of translating.
    OpenDetail(WordId),
}

/// A translated selection ready to become a dictionary entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewVocabulary {
    pub word: String,
    pub translation: String,
}

/// Owns the current selection and its translation. One selection at a time;
/// a newer selection replaces the old one and answers for the old one are
/// dropped.
#[derive(Debug)]
pub struct SelectionWorkflow {
    phase: SelectionPhase,
    last_token: SessionToken,
}

impl Default for SelectionWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionWorkflow {
    pub fn new() -> Self {
        Self {
            phase: SelectionPhase::Idle,
            last_token: 0,
        }
    }

    pub fn phase(&self) -> &SelectionPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, SelectionPhase::Idle)
    }

    pub fn selection(&self) -> Option<&SelectionState> {
        match &self.phase {
            SelectionPhase::Idle => None,
            SelectionPhase::Selecting { selection, .. }
            | SelectionPhase::DialogOpen { selection, .. } => Some(selection),
        }
    }

    pub fn status(&self) -> Option<TranslationStatus<'_>> {
        match &self.phase {
            SelectionPhase::Idle => None,
            SelectionPhase::Selecting { .. } => Some(TranslationStatus::Pending),
            SelectionPhase::DialogOpen { result: Ok(t), .. } => Some(TranslationStatus::Ready(t)),
            SelectionPhase::DialogOpen { result: Err(e), .. } => {
                Some(TranslationStatus::Failed(e))
            }
        }
    }

    pub fn current_token(&self) -> Option<SessionToken> {
        match &self.phase {
            SelectionPhase::Idle => None,
            SelectionPhase::Selecting { token, .. } | SelectionPhase::DialogOpen { token, .. } => {
                Some(*token)
            }
        }
    }

    /// Free-text selection on the page. Selections of one character or less,
    /// counted after whitespace is collapsed, are ignored and leave the
    /// current state alone.
    pub fn select_text(
        &mut self,
        raw: &str,
        anchor: Option<Anchor>,
        languages: &Languages,
    ) -> Result<Option<TranslationRequest>, ValidationError> {
        let text = collapse_whitespace(raw);
        if text.chars().count() <= 1 {
            return Ok(None);
        }
        self.begin(text, anchor, languages).map(Some)
    }

    /// A click on a single word. Tracked words open their detail view.
    pub fn click_word(
        &mut self,
        word: &str,
        anchor: Option<Anchor>,
        index: &ProgressIndex,
        languages: &Languages,
    ) -> Result<WordClickOutcome, ValidationError> {
        if let Some(record) = index.lookup(word) {
            self.close();
            return Ok(WordClickOutcome::OpenDetail(record.id));
        }
        self.begin(word.to_string(), anchor, languages)
            .map(WordClickOutcome::Translate)
    }

    /// Translate `word` regardless of whether it is tracked.
    pub fn translate_word(
        &mut self,
        word: &str,
        anchor: Option<Anchor>,
        languages: &Languages,
    ) -> Result<TranslationRequest, ValidationError> {
        self.begin(word.to_string(), anchor, languages)
    }

    fn begin(
        &mut self,
        text: String,
        anchor: Option<Anchor>,
        languages: &Languages,
    ) -> Result<TranslationRequest, ValidationError> {
        let len = text.chars().count();
        if len > MAX_SELECTION_CHARS {
            warn!("selection of {len} characters rejected");
            self.phase = SelectionPhase::Idle;
            return Err(ValidationError::SelectionTooLong {
                len,
                max: MAX_SELECTION_CHARS,
            });
        }

        let Some(native) = languages
            .native
            .as_deref()
            .filter(|lang| !lang.trim().is_empty())
        else {
            self.phase = SelectionPhase::Idle;
            return Err(ValidationError::MissingNativeLanguage);
        };

        if let Some(previous) = self.current_token() {
            debug!("selection {previous} replaced");
        }

        self.last_token += 1;
        let token = self.last_token;
        let request = TranslateRequest::new(&text, &languages.book, native);
        info!(
            "selection {token}: translating {len} chars {}->{}",
            request.source_lang, request.target_lang
        );

        self.phase = SelectionPhase::Selecting {
            token,
            selection: SelectionState {
                selected_text: text,
                anchor,
            },
        };

        Ok(TranslationRequest { token, request })
    }

    /// Apply a translation answer. Answers for any session other than the
    /// current one are dropped; returns whether the answer was applied.
    pub fn receive_translation(
        &mut self,
        token: SessionToken,
        result: Result<String, NetworkError>,
    ) -> bool {
        if self.current_token() != Some(token) {
            debug!("dropping stale translation for selection {token}");
            return false;
        }

        let phase = std::mem::replace(&mut self.phase, SelectionPhase::Idle);
        if let SelectionPhase::Selecting { token, selection }
        | SelectionPhase::DialogOpen {
            token, selection, ..
        } = phase
        {
            if let Err(e) = &result {
                warn!("translation for selection {token} failed: {e}");
            }
            self.phase = SelectionPhase::DialogOpen {
                token,
                selection,
                result,
            };
        }
        true
    }

    /// Close the dialog and forget the selection.
    pub fn close(&mut self) -> Option<SelectionState> {
        match std::mem::replace(&mut self.phase, SelectionPhase::Idle) {
            SelectionPhase::Idle => None,
            SelectionPhase::Selecting { selection, .. }
            | SelectionPhase::DialogOpen { selection, .. } => Some(selection),
        }
    }

    /// Take the translated selection for vocabulary creation and close.
    pub fn add_to_dictionary(&mut self) -> Result<NewVocabulary, EngineError> {
        let vocabulary = match &self.phase {
            SelectionPhase::Idle => return Err(StateError::NoSelection.into()),
            SelectionPhase::DialogOpen {
                selection,
                result: Ok(translation),
                ..
            } => NewVocabulary {
                word: selection.selected_text.clone(),
                translation: translation.clone(),
            },
            _ => return Err(ValidationError::MissingField("translation").into()),
        };
        self.close();
        Ok(vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress_index::ProgressRecord;

    fn languages() -> Languages {
        Languages {
            book: "de-DE".to_string(),
            native: Some("en-US".to_string()),
        }
    }

    #[test]
    fn test_selection_issues_request_with_short_codes() {
        let mut wf = SelectionWorkflow::new();
        let req = wf
            .select_text("guten  Tag\n", None, &languages())
            .unwrap()
            .unwrap();
        assert_eq!(req.request.text, "guten Tag");
        assert_eq!(req.request.source_lang, "de");
        assert_eq!(req.request.target_lang, "en");
        assert_eq!(wf.status(), Some(TranslationStatus::Pending));
        assert_eq!(wf.selection().unwrap().selected_text, "guten Tag");
    }

    #[test]
    fn test_single_char_selection_is_ignored() {
        let mut wf = SelectionWorkflow::new();
        assert_eq!(wf.select_text("a", None, &languages()), Ok(None));
        assert_eq!(wf.select_text("", None, &languages()), Ok(None));
        assert_eq!(wf.select_text(" \n ", None, &languages()), Ok(None));
        assert!(wf.is_idle());
    }

    #[test]
    fn test_padded_single_char_is_ignored() {
        let mut wf = SelectionWorkflow::new();
        assert_eq!(wf.select_text(" a", None, &languages()), Ok(None));
        assert_eq!(wf.select_text("\n b \t", None, &languages()), Ok(None));
        assert!(wf.is_idle());
        assert_eq!(wf.current_token(), None);
    }

    #[test]
    fn test_selection_of_exactly_max_is_accepted() {
        let mut wf = SelectionWorkflow::new();
        let text = "a".repeat(MAX_SELECTION_CHARS);
        let req = wf.select_text(&text, None, &languages()).unwrap();
        assert!(req.is_some());
    }

    #[test]
    fn test_selection_over_max_is_rejected_without_request() {
        let mut wf = SelectionWorkflow::new();
        let text = "a".repeat(MAX_SELECTION_CHARS + 1);
        let result = wf.select_text(&text, None, &languages());
        assert_eq!(
            result,
            Err(ValidationError::SelectionTooLong {
                len: 1000,
                max: MAX_SELECTION_CHARS
            })
        );
        assert!(wf.is_idle());
    }

    #[test]
    fn test_length_is_measured_after_whitespace_collapse() {
        let mut wf = SelectionWorkflow::new();
        // 500 one-letter words separated by runs of three spaces.
        let text = vec!["a"; 500].join("   ");
        assert!(text.chars().count() > MAX_SELECTION_CHARS);
        assert!(wf.select_text(&text, None, &languages()).unwrap().is_some());
    }

    #[test]
    fn test_over_long_selection_clears_open_dialog() {
        let mut wf = SelectionWorkflow::new();
        let req = wf.select_text("hallo Welt", None, &languages()).unwrap().unwrap();
        wf.receive_translation(req.token, Ok("hello world".to_string()));
        let _ = wf.select_text(&"b".repeat(2000), None, &languages());
        assert!(wf.is_idle());
    }

    #[test]
    fn test_missing_native_language_is_rejected() {
        let mut wf = SelectionWorkflow::new();
        let langs = Languages {
            book: "de".to_string(),
            native: None,
        };
        assert_eq!(
            wf.select_text("hallo", None, &langs),
            Err(ValidationError::MissingNativeLanguage)
        );
        let blank = Languages {
            book: "de".to_string(),
            native: Some("  ".to_string()),
        };
        assert_eq!(
            wf.select_text("hallo", None, &blank),
            Err(ValidationError::MissingNativeLanguage)
        );
        assert!(wf.is_idle());
    }

    #[test]
    fn test_result_opens_dialog() {
        let mut wf = SelectionWorkflow::new();
        let req = wf.select_text("hallo", None, &languages()).unwrap().unwrap();
        assert!(wf.receive_translation(req.token, Ok("hello".to_string())));
        assert_eq!(wf.status(), Some(TranslationStatus::Ready("hello")));
        assert!(matches!(wf.phase(), SelectionPhase::DialogOpen { .. }));
    }

    #[test]
    fn test_error_result_opens_dialog_with_error() {
        let mut wf = SelectionWorkflow::new();
        let req = wf.select_text("hallo", None, &languages()).unwrap().unwrap();
        let err = NetworkError::Transport("timed out".to_string());
        assert!(wf.receive_translation(req.token, Err(err.clone())));
        assert_eq!(wf.status(), Some(TranslationStatus::Failed(&err)));
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut wf = SelectionWorkflow::new();
        let a = wf.select_text("erste Auswahl", None, &languages()).unwrap().unwrap();
        let b = wf.select_text("zweite Auswahl", None, &languages()).unwrap().unwrap();
        assert!(b.token > a.token);

        assert!(!wf.receive_translation(a.token, Ok("first selection".to_string())));
        assert_eq!(wf.status(), Some(TranslationStatus::Pending));
        assert_eq!(wf.selection().unwrap().selected_text, "zweite Auswahl");

        assert!(wf.receive_translation(b.token, Ok("second selection".to_string())));
        assert_eq!(
            wf.status(),
            Some(TranslationStatus::Ready("second selection"))
        );
    }

    #[test]
    fn test_response_after_close_is_discarded() {
        let mut wf = SelectionWorkflow::new();
        let req = wf.select_text("hallo", None, &languages()).unwrap().unwrap();
        wf.close();
        assert!(!wf.receive_translation(req.token, Ok("hello".to_string())));
        assert!(wf.is_idle());
    }

    #[test]
    fn test_click_on_untracked_word_translates() {
        let mut wf = SelectionWorkflow::new();
        let index = ProgressIndex::default();
        let anchor = Some(Anchor { line: 2, col: 4 });
        match wf.click_word("Baum", anchor, &index, &languages()).unwrap() {
            WordClickOutcome::Translate(req) => assert_eq!(req.request.text, "Baum"),
            other => panic!("expected translation, got {other:?}"),
        }
        assert_eq!(wf.selection().unwrap().anchor, anchor);
    }

    #[test]
    fn test_click_on_tracked_word_opens_detail() {
        let mut wf = SelectionWorkflow::new();
        let index = ProgressIndex::from_records([ProgressRecord {
            id: 12,
            word: "baum".to_string(),
            progress: 3,
            highlight_disabled: false,
            count: 1,
            translation: "tree".to_string(),
        }]);
        let outcome = wf.click_word("Baum", None, &index, &languages()).unwrap();
        assert_eq!(outcome, WordClickOutcome::OpenDetail(12));
        assert!(wf.is_idle());
    }

    #[test]
    fn test_add_to_dictionary_forwards_and_closes() {
        let mut wf = SelectionWorkflow::new();
        let req = wf.select_text("Baum", None, &languages()).unwrap().unwrap();
        wf.receive_translation(req.token, Ok("tree".to_string()));
        let vocab = wf.add_to_dictionary().unwrap();
        assert_eq!(
            vocab,
            NewVocabulary {
                word: "Baum".to_string(),
                translation: "tree".to_string()
            }
        );
        assert!(wf.is_idle());
    }

    #[test]
    fn test_add_to_dictionary_needs_translation() {
        let mut wf = SelectionWorkflow::new();
        assert_eq!(
            wf.add_to_dictionary(),
            Err(EngineError::State(StateError::NoSelection))
        );
        let req = wf.select_text("Baum", None, &languages()).unwrap().unwrap();
        assert!(matches!(
            wf.add_to_dictionary(),
            Err(EngineError::Validation(ValidationError::MissingField(_)))
        ));
        // Still waiting on the same selection.
        assert_eq!(wf.current_token(), Some(req.token));
    }
}
