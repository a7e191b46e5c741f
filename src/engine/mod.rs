pub mod highlight;
pub mod progress_index;

pub use highlight::{Highlight, HighlightPalette, resolve_highlight};
pub use progress_index::{ProgressIndex, ProgressRecord, WordId, WordUpdate};
