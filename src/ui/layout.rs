use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::session::selection::Anchor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutTier {
    Wide,   // ≥100 cols: page + training sidebar
    Narrow, // page only
}

impl LayoutTier {
    pub fn from_area(area: Rect) -> Self {
        if area.width >= 100 {
            LayoutTier::Wide
        } else {
            LayoutTier::Narrow
        }
    }
}

pub struct AppLayout {
    pub header: Rect,
    pub main: Rect,
    pub sidebar: Option<Rect>,
    pub footer: Rect,
    pub tier: LayoutTier,
}

impl AppLayout {
    /// The sidebar only appears when asked for and the terminal is wide enough.
    pub fn new(area: Rect, want_sidebar: bool) -> Self {
        let tier = LayoutTier::from_area(area);

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        if want_sidebar && tier == LayoutTier::Wide {
            let horizontal = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
                .split(vertical[1]);

            Self {
                header: vertical[0],
                main: horizontal[0],
                sidebar: Some(horizontal[1]),
                footer: vertical[2],
                tier,
            }
        } else {
            Self {
                header: vertical[0],
                main: vertical[1],
                sidebar: None,
                footer: vertical[2],
                tier,
            }
        }
    }
}

pub fn pack_hint_lines(hints: &[&str], width: usize) -> Vec<String> {
    if width == 0 || hints.is_empty() {
        return Vec::new();
    }

    let separator = "  ";
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for hint in hints.iter().filter(|h| !h.is_empty()) {
        let candidate = if current.is_empty() {
            hint.to_string()
        } else {
            format!("{current}{separator}{hint}")
        };
        if candidate.chars().count() <= width || current.is_empty() {
            current = candidate;
        } else {
            out.push(std::mem::replace(&mut current, hint.to_string()));
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let left = area.x.saturating_add((area.width - w) / 2);
    let top = area.y.saturating_add((area.height - h) / 2);
    Rect::new(left, top, w, h)
}

/// A `width`x`height` popup next to `anchor`, a position inside the scrolled
/// `text` area. Goes below the anchored line when there is room, above it
/// otherwise, and is clamped to `frame`. Without a visible anchor the popup
/// is centered.
pub fn popup_near(
    anchor: Option<Anchor>,
    scroll: u16,
    text: Rect,
    frame: Rect,
    width: u16,
    height: u16,
) -> Rect {
    let w = width.min(frame.width);
    let h = height.min(frame.height);

    let visible = anchor.and_then(|a| {
        let row = a.line.checked_sub(scroll as usize)?;
        (row < text.height as usize).then(|| (text.y + row as u16, text.x + a.col))
    });
    let Some((row, col)) = visible else {
        return centered_rect(w, h, frame);
    };

    let frame_bottom = frame.y + frame.height;
    let top = if row + 1 + h <= frame_bottom {
        row + 1
    } else if row >= frame.y + h {
        row - h
    } else {
        frame_bottom - h
    };
    let left = col.min(frame.x + frame.width - w).max(frame.x);
    Rect::new(left, top, w, h)
}
