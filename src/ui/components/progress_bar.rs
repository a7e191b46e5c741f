use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;

use crate::engine::highlight::HighlightPalette;
use crate::engine::progress_index::MAX_PROGRESS;
use crate::ui::theme::Theme;

/// One-line gauge of a word's progress, filled with the ramp color of the
/// current step.
pub struct ProgressBar<'a> {
    progress: u8,
    palette: &'a HighlightPalette,
    theme: &'a Theme,
}

impl<'a> ProgressBar<'a> {
    pub fn new(progress: u8, palette: &'a HighlightPalette, theme: &'a Theme) -> Self {
        Self {
            progress: progress.min(MAX_PROGRESS),
            palette,
            theme,
        }
    }

    fn label(&self) -> String {
        format!("{}/{MAX_PROGRESS}", self.progress)
    }
}

impl Widget for ProgressBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let colors = &self.theme.colors;
        let label = self.label();
        let label_w = label.len() as u16 + 1;
        let bar_w = area.width.saturating_sub(label_w);

        let filled = (bar_w as u32 * self.progress as u32 / MAX_PROGRESS as u32) as u16;
        let fill = self.palette.ramp_color(self.progress);
        for x in area.x..area.x + bar_w {
            let style = if x < area.x + filled {
                Style::default().bg(fill)
            } else {
                Style::default().bg(colors.bar_empty())
            };
            buf[(x, area.y)].set_style(style);
        }

        buf.set_string(
            area.x + bar_w + 1,
            area.y,
            &label,
            Style::default().fg(colors.fg()),
        );
    }
}
