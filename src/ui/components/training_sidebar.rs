use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::session::training::TrainingQueue;
use crate::ui::theme::Theme;

pub struct TrainingSidebar<'a> {
    queue: &'a TrainingQueue,
    theme: &'a Theme,
}

impl<'a> TrainingSidebar<'a> {
    pub fn new(queue: &'a TrainingQueue, theme: &'a Theme) -> Self {
        Self { queue, theme }
    }
}

impl Widget for TrainingSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" Training ({}) ", self.queue.len()))
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.bg()));

        let lines: Vec<Line> = if self.queue.is_empty() {
            vec![Line::from(Span::styled(
                "Press [t] in a dialog to queue a word.",
                Style::default().fg(colors.text_dim()),
            ))]
        } else {
            self.queue
                .words()
                .iter()
                .map(|w| {
                    Line::from(vec![
                        Span::styled(w.word.as_str(), Style::default().fg(colors.accent())),
                        Span::styled(
                            format!("  {}", w.translation),
                            Style::default().fg(colors.text_dim()),
                        ),
                    ])
                })
                .collect()
        };

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
