use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::engine::highlight::HighlightPalette;
use crate::session::word_detail::{DetailState, WordDetailSession};
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::layout::pack_hint_lines;
use crate::ui::theme::Theme;

pub const DETAIL_WIDTH: u16 = 52;
pub const DETAIL_HEIGHT: u16 = 13;

const OPEN_HINTS: &[&str] = &[
    "[\u{2191}/\u{2193}] progress",
    "[h] highlight",
    "[t] train",
    "[s] speak",
    "[e] edit",
    "[d] delete",
    "[esc] close",
];

pub struct WordDetailModal<'a> {
    state: &'a DetailState,
    palette: &'a HighlightPalette,
    theme: &'a Theme,
}

impl<'a> WordDetailModal<'a> {
    pub fn new(state: &'a DetailState, palette: &'a HighlightPalette, theme: &'a Theme) -> Self {
        Self {
            state,
            palette,
            theme,
        }
    }

    fn session_lines(&self, session: &WordDetailSession) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let label = Style::default().fg(colors.text_dim());
        let value = Style::default().fg(colors.fg());

        let note = if session.progress_changed {
            let arrow = if session.local_progress > session.baseline_progress {
                "\u{2191}"
            } else {
                "\u{2193}"
            };
            Line::from(Span::styled(
                format!(
                    "          {} {arrow} {} (locked)",
                    session.baseline_progress, session.local_progress
                ),
                Style::default().fg(colors.accent()),
            ))
        } else {
            Line::default()
        };

        vec![
            Line::from(Span::styled(
                session.word.clone(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(session.translation.clone(), value)),
            Line::default(),
            Line::from(Span::styled("Progress", label)),
            note,
            Line::from(vec![
                Span::styled("Seen      ", label),
                Span::styled(format!("{} times", session.local_count), value),
            ]),
            Line::from(vec![
                Span::styled("Highlight ", label),
                Span::styled(
                    if session.highlight_disabled { "off" } else { "on" },
                    value,
                ),
            ]),
        ]
    }
}

impl Widget for WordDetailModal<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        Clear.render(area, buf);

        let block = Block::bordered()
            .title(" Word ")
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let hints = match self.state {
            DetailState::Open(_) => OPEN_HINTS,
            _ => &["[d] delete", "[esc] close"][..],
        };
        let hint_lines = pack_hint_lines(hints, inner.width as usize);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(hint_lines.len() as u16),
            ])
            .split(inner);

        match self.state {
            DetailState::Open(session) => {
                // Unwrapped so the gauge row stays put.
                Paragraph::new(self.session_lines(session)).render(rows[0], buf);
                let gauge = Rect {
                    x: rows[0].x + 10,
                    y: rows[0].y + 3,
                    width: rows[0].width.saturating_sub(10),
                    height: 1,
                };
                if gauge.y < rows[0].y + rows[0].height {
                    ProgressBar::new(session.local_progress, self.palette, self.theme)
                        .render(gauge, buf);
                }
            }
            DetailState::Loading { word_id } => {
                Paragraph::new(format!("Loading word {word_id}..."))
                    .style(Style::default().fg(colors.text_dim()))
                    .render(rows[0], buf);
            }
            DetailState::Failed { word_id, error } => {
                Paragraph::new(format!("Could not load word {word_id}: {error}"))
                    .style(Style::default().fg(colors.error()))
                    .wrap(Wrap { trim: true })
                    .render(rows[0], buf);
            }
            DetailState::Closed => {}
        }

        let hint_style = Style::default().fg(colors.text_dim());
        for (i, hint) in hint_lines.iter().enumerate() {
            buf.set_string(rows[1].x, rows[1].y + i as u16, hint, hint_style);
        }
    }
}
