use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::session::selection::TranslationStatus;
use crate::ui::layout::pack_hint_lines;
use crate::ui::theme::Theme;

pub const DIALOG_WIDTH: u16 = 48;
pub const DIALOG_HEIGHT: u16 = 10;

pub struct TranslationDialog<'a> {
    text: &'a str,
    status: TranslationStatus<'a>,
    theme: &'a Theme,
}

impl<'a> TranslationDialog<'a> {
    pub fn new(text: &'a str, status: TranslationStatus<'a>, theme: &'a Theme) -> Self {
        Self {
            text,
            status,
            theme,
        }
    }

    fn hints(&self) -> Vec<&'static str> {
        match self.status {
            TranslationStatus::Ready(_) => {
                vec!["[a] add to dictionary", "[t] train", "[s] speak", "[esc] close"]
            }
            _ => vec!["[s] speak", "[esc] close"],
        }
    }
}

impl Widget for TranslationDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let hints = self.hints();
        Clear.render(area, buf);

        let block = Block::bordered()
            .title(" Translation ")
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines = vec![
            Line::from(Span::styled(
                self.text.to_string(),
                Style::default()
                    .fg(colors.accent())
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
        ];
        lines.push(match self.status {
            TranslationStatus::Pending => Line::from(Span::styled(
                "Translating...",
                Style::default().fg(colors.text_dim()),
            )),
            TranslationStatus::Ready(translation) => Line::from(Span::styled(
                translation.to_string(),
                Style::default().fg(colors.fg()),
            )),
            TranslationStatus::Failed(error) => Line::from(Span::styled(
                format!("Translation failed: {error}"),
                Style::default().fg(colors.error()),
            )),
        });

        let hint_lines = pack_hint_lines(&hints, inner.width as usize);
        let hint_h = hint_lines.len() as u16;
        let body = Rect {
            height: inner.height.saturating_sub(hint_h),
            ..inner
        };
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .render(body, buf);

        let hint_style = Style::default().fg(colors.text_dim());
        for (i, hint) in hint_lines.iter().enumerate() {
            let y = body.y + body.height + i as u16;
            if y < inner.y + inner.height {
                buf.set_string(inner.x, y, hint, hint_style);
            }
        }
    }
}
