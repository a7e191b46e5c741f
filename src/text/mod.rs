pub mod tokenizer;

pub use tokenizer::{Token, TokenKind, tokenize};

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
