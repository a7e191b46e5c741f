use ratatui::style::{Color, Modifier, Style};

use crate::engine::progress_index::{MAX_PROGRESS, ProgressIndex, ProgressRecord};
use crate::text::{Token, TokenKind};
use crate::ui::theme::Theme;

pub const RAMP_LEN: usize = MAX_PROGRESS as usize + 1;

/// How a tracked word should be emphasized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
    /// Colored by learning progress, `0..=MAX_PROGRESS`.
    Progress(u8),
    /// Tracked, but the reader switched emphasis off.
    Neutral,
}

impl Highlight {
    pub fn for_record(record: &ProgressRecord) -> Self {
        if record.highlight_disabled {
            Highlight::Neutral
        } else {
            Highlight::Progress(record.progress.min(MAX_PROGRESS))
        }
    }
}

/// Highlight for a word, or `None` when the word is not tracked.
pub fn resolve_highlight(word: &str, index: &ProgressIndex) -> Option<Highlight> {
    index.lookup(word).map(Highlight::for_record)
}

/// Highlight for any token. Only word tokens can be highlighted.
pub fn resolve_token(token: &Token<'_>, index: &ProgressIndex) -> Option<Highlight> {
    match token.kind {
        TokenKind::Word => resolve_highlight(token.text, index),
        _ => None,
    }
}

/// Maps highlights to terminal styles. Index 0 of the ramp is "not learned".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightPalette {
    ramp: [Color; RAMP_LEN],
    neutral: Color,
}

impl HighlightPalette {
    pub fn new(ramp: [Color; RAMP_LEN], neutral: Color) -> Self {
        Self { ramp, neutral }
    }

    pub fn from_theme(theme: &Theme) -> Self {
        Self::new(
            theme.colors.progress_ramp(),
            theme.colors.highlight_neutral(),
        )
    }

    pub fn ramp_color(&self, progress: u8) -> Color {
        self.ramp[progress.min(MAX_PROGRESS) as usize]
    }

    pub fn style(&self, highlight: Highlight) -> Style {
        match highlight {
            // Low progress words are underlined as well, so they stand out
            // even on terminals with a reduced palette.
            Highlight::Progress(p) if p < 3 => Style::default()
                .fg(self.ramp_color(p))
                .add_modifier(Modifier::UNDERLINED),
            Highlight::Progress(p) => Style::default().fg(self.ramp_color(p)),
            Highlight::Neutral => Style::default().fg(self.neutral),
        }
    }
}

impl Default for HighlightPalette {
    fn default() -> Self {
        Self::from_theme(&Theme::default())
    }
}
