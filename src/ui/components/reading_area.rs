use std::ops::Range;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::engine::highlight::{HighlightPalette, resolve_token};
use crate::engine::progress_index::ProgressIndex;
use crate::session::selection::Anchor;
use crate::text::{Token, TokenKind};
use crate::ui::theme::Theme;

/// A token, or a piece of one, placed on a screen line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedUnit {
    pub token_index: usize,
    pub kind: TokenKind,
    /// Whole token in the source text.
    pub token: Range<usize>,
    /// The part of the token shown by this unit.
    pub bytes: Range<usize>,
    pub line: usize,
    pub col: u16,
    pub width: u16,
}

/// What sits under a screen cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hit {
    /// Byte offset of the character under the pointer.
    pub offset: usize,
    /// Byte offset just past that character.
    pub offset_end: usize,
    /// The word token under the pointer, if any.
    pub word: Option<Range<usize>>,
}

/// Word-wrapped placement of a token stream for a given width.
#[derive(Clone, Debug, Default)]
pub struct PageLayout {
    units: Vec<PlacedUnit>,
    line_count: usize,
    width: u16,
}

/// Terminal cells taken by a token. Whitespace is drawn as one space per char.
fn display_width(kind: TokenKind, text: &str) -> usize {
    match kind {
        TokenKind::Whitespace => text.chars().count(),
        _ => text.width(),
    }
}

fn char_width(kind: TokenKind, ch: char) -> usize {
    match kind {
        TokenKind::Whitespace => 1,
        _ => ch.width().unwrap_or(0),
    }
}

impl PageLayout {
    pub fn build(tokens: &[Token<'_>], width: u16) -> Self {
        let max = width.max(1) as usize;
        let mut units = Vec::new();
        let mut line = 0usize;
        let mut col = 0usize;

        for (i, token) in tokens.iter().enumerate() {
            let place = |units: &mut Vec<PlacedUnit>,
                         bytes: Range<usize>,
                         line: usize,
                         col: usize,
                         width: usize| {
                units.push(PlacedUnit {
                    token_index: i,
                    kind: token.kind,
                    token: token.range(),
                    bytes,
                    line,
                    col: col as u16,
                    width: width as u16,
                });
            };

            match token.kind {
                TokenKind::Newline => {
                    place(&mut units, token.range(), line, col, 0);
                    line += 1;
                    col = 0;
                }
                TokenKind::Whitespace => {
                    let w = display_width(token.kind, token.text);
                    if col + w > max {
                        // Whitespace at a wrap point is swallowed by the line end.
                        place(&mut units, token.range(), line, col, max.saturating_sub(col));
                        line += 1;
                        col = 0;
                    } else {
                        place(&mut units, token.range(), line, col, w);
                        col += w;
                    }
                }
                TokenKind::Word | TokenKind::Punctuation => {
                    let w = display_width(token.kind, token.text);
                    if col > 0 && col + w > max {
                        line += 1;
                        col = 0;
                    }
                    if col + w <= max {
                        place(&mut units, token.range(), line, col, w);
                        col += w;
                        continue;
                    }
                    // Longer than a whole line: hard split.
                    let mut piece_start = token.start;
                    let mut piece_width = 0usize;
                    for (offset, ch) in token.text.char_indices() {
                        let cw = char_width(token.kind, ch);
                        if piece_width > 0 && col + piece_width + cw > max {
                            let at = token.start + offset;
                            place(&mut units, piece_start..at, line, col, piece_width);
                            line += 1;
                            col = 0;
                            piece_start = at;
                            piece_width = 0;
                        }
                        piece_width += cw;
                    }
                    place(
                        &mut units,
                        piece_start..token.start + token.text.len(),
                        line,
                        col,
                        piece_width,
                    );
                    col += piece_width;
                }
            }
        }

        let line_count = if units.is_empty() { 0 } else { line + 1 };
        Self {
            units,
            line_count,
            width,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn units(&self) -> &[PlacedUnit] {
        &self.units
    }

    pub fn line_units(&self, line: usize) -> &[PlacedUnit] {
        let start = self.units.partition_point(|u| u.line < line);
        let end = self.units.partition_point(|u| u.line <= line);
        &self.units[start..end]
    }

    /// Screen position of the first unit of the token starting at `offset`.
    pub fn anchor_of(&self, offset: usize) -> Option<Anchor> {
        self.units
            .iter()
            .find(|u| u.token.start == offset)
            .map(|u| Anchor {
                line: u.line,
                col: u.col,
            })
    }

    /// Resolve a cell on `line` at column `col` against `source`. Clicking past
    /// the end of a line lands on its last character.
    pub fn hit_test(&self, source: &str, line: usize, col: u16) -> Option<Hit> {
        let units = self.line_units(line);
        let last = units.last()?;

        let unit = units
            .iter()
            .find(|u| col >= u.col && col < u.col + u.width)
            .unwrap_or(last);

        let piece = source.get(unit.bytes.clone())?;
        let target = col.saturating_sub(unit.col) as usize;
        let mut cells = 0usize;
        let (rel, ch) = piece
            .char_indices()
            .find(|&(_, ch)| {
                cells += char_width(unit.kind, ch);
                target < cells
            })
            .or_else(|| piece.char_indices().last())?;
        let offset = unit.bytes.start + rel;

        Some(Hit {
            offset,
            offset_end: offset + ch.len_utf8(),
            word: (unit.kind == TokenKind::Word).then(|| unit.token.clone()),
        })
    }
}

/// A completed pointer gesture on the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageGesture {
    /// Press and release on the same word. Page-level selection does not run.
    WordClick { word: Range<usize>, anchor: Anchor },
    /// Free selection over a byte range of the page.
    Select { range: Range<usize>, anchor: Anchor },
}

#[derive(Clone, Debug)]
struct Press {
    hit: Hit,
    anchor: Anchor,
    dragged: Option<Hit>,
}

/// Turns press/drag/release into word clicks or free selections.
#[derive(Clone, Debug, Default)]
pub struct PointerTracker {
    press: Option<Press>,
}

impl PointerTracker {
    pub fn press(&mut self, hit: Hit, anchor: Anchor) {
        self.press = Some(Press {
            hit,
            anchor,
            dragged: None,
        });
    }

    pub fn drag(&mut self, hit: Hit) {
        if let Some(press) = self.press.as_mut() {
            press.dragged = Some(hit);
        }
    }

    pub fn cancel(&mut self) {
        self.press = None;
    }

    /// Byte range covered by the drag in progress.
    pub fn live_range(&self) -> Option<Range<usize>> {
        let press = self.press.as_ref()?;
        let end = press.dragged.as_ref()?;
        Some(span(&press.hit, end))
    }

    pub fn release(&mut self, hit: Option<Hit>) -> Option<PageGesture> {
        let press = self.press.take()?;
        let end = hit.or(press.dragged).unwrap_or_else(|| press.hit.clone());

        if let Some(word) = &press.hit.word
            && end.word.as_ref() == Some(word)
        {
            return Some(PageGesture::WordClick {
                word: word.clone(),
                anchor: press.anchor,
            });
        }

        let range = span(&press.hit, &end);
        if range.is_empty() {
            return None;
        }
        Some(PageGesture::Select {
            range,
            anchor: press.anchor,
        })
    }
}

fn span(a: &Hit, b: &Hit) -> Range<usize> {
    a.offset.min(b.offset)..a.offset_end.max(b.offset_end)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Renders a page: words carry their progress highlight, everything else is
/// drawn verbatim.
pub struct ReadingArea<'a> {
    source: &'a str,
    tokens: &'a [Token<'a>],
    layout: &'a PageLayout,
    index: &'a ProgressIndex,
    palette: &'a HighlightPalette,
    theme: &'a Theme,
    selection: Option<Range<usize>>,
    focus: Option<Range<usize>>,
    scroll: u16,
    title: String,
}

impl<'a> ReadingArea<'a> {
    pub fn new(
        source: &'a str,
        tokens: &'a [Token<'a>],
        layout: &'a PageLayout,
        index: &'a ProgressIndex,
        palette: &'a HighlightPalette,
        theme: &'a Theme,
    ) -> Self {
        Self {
            source,
            tokens,
            layout,
            index,
            palette,
            theme,
            selection: None,
            focus: None,
            scroll: 0,
            title: String::new(),
        }
    }

    pub fn selection(mut self, range: Option<Range<usize>>) -> Self {
        self.selection = range;
        self
    }

    pub fn focus(mut self, range: Option<Range<usize>>) -> Self {
        self.focus = range;
        self
    }

    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    fn unit_style(&self, unit: &PlacedUnit) -> Style {
        let colors = &self.theme.colors;
        let mut style = Style::default().fg(colors.fg());

        if unit.kind == TokenKind::Word
            && let Some(token) = self.tokens.get(unit.token_index)
            && let Some(highlight) = resolve_token(token, self.index)
        {
            style = style.patch(self.palette.style(highlight));
        }
        if let Some(sel) = &self.selection
            && overlaps(sel, &unit.bytes)
        {
            style = style.bg(colors.selection_bg());
        }
        if let Some(focus) = &self.focus
            && *focus == unit.token
        {
            style = style.add_modifier(Modifier::REVERSED);
        }
        style
    }

    fn build_lines(&self) -> Vec<Line<'static>> {
        let mut lines: Vec<Vec<Span<'static>>> = vec![Vec::new(); self.layout.line_count()];

        for unit in self.layout.units() {
            let display = match unit.kind {
                TokenKind::Newline => continue,
                TokenKind::Whitespace => " ".repeat(unit.width as usize),
                _ => self
                    .source
                    .get(unit.bytes.clone())
                    .unwrap_or_default()
                    .to_string(),
            };
            if let Some(line) = lines.get_mut(unit.line) {
                line.push(Span::styled(display, self.unit_style(unit)));
            }
        }

        lines.into_iter().map(Line::from).collect()
    }
}

impl Widget for ReadingArea<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let mut block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));
        if !self.title.is_empty() {
            block = block.title(format!(" {} ", self.title));
        }

        let paragraph = Paragraph::new(self.build_lines())
            .block(block)
            .scroll((self.scroll, 0));

        paragraph.render(area, buf);
    }
}
